//! Compiling OpenAPI documents into tool declarations.

use std::io::Write;

use restkit::tools::openapi::{
    DeclarationFormat, OpenApiSpec, OpenApiToolSet, ParamLocation, ToolsetOptions,
};
use restkit::tools::{BaseTool, BaseToolset};
use restkit::RestkitError;
use serde_json::json;

const PETSTORE: &str = r#"
openapi: 3.0.0
info:
  title: Petstore
  version: 1.0.0
servers:
  - url: https://{region}.petstore.example.com/v1
    variables:
      region:
        default: eu
paths:
  /pets:
    get:
      summary: List all pets
      parameters:
        - name: limit
          in: query
          schema:
            type: Integer
            default: 20
        - name: status
          in: query
          schema:
            type: [string, "null"]
            enum: [available, sold]
      responses:
        "200":
          description: A list of pets
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: "#/components/schemas/Pet"
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/NewPet"
      responses:
        "201":
          description: Created
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema:
          type: string
    get:
      operationId: showPetById
      description: Info for a specific pet
      responses:
        default:
          description: The pet
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Pet"
components:
  schemas:
    Pet:
      type: object
      required: [id, name]
      properties:
        id:
          type: integer
          format: int64
        name:
          type: string
        tag:
          type: Any
        owner:
          $ref: "#/components/schemas/Owner"
    Owner:
      type: object
      properties:
        name:
          type: string
        pets:
          type: array
          items:
            $ref: "#/components/schemas/Pet"
    NewPet:
      type: object
      required: [name]
      properties:
        name:
          type: string
        type:
          type: string
"#;

fn petstore(options: ToolsetOptions) -> OpenApiToolSet {
    OpenApiToolSet::from_str("petstore", PETSTORE, options).unwrap()
}

#[test]
fn every_operation_becomes_a_tool() {
    let toolset = petstore(ToolsetOptions::default());
    let names: Vec<&str> = toolset.tools().iter().map(|tool| tool.name()).collect();
    assert_eq!(names, vec!["get_pets", "create_pet", "show_pet_by_id"]);

    assert_eq!(toolset.tools()[0].description(), "List all pets");
    assert_eq!(toolset.tools()[2].description(), "Info for a specific pet");
}

#[test]
fn server_variables_are_substituted() {
    let toolset = petstore(ToolsetOptions::default());
    assert_eq!(
        toolset.tools()[0].operation().endpoint.base_url,
        "https://eu.petstore.example.com/v1"
    );
}

#[test]
fn structured_declaration_uses_openapi_subset() {
    let toolset = petstore(ToolsetOptions::default());
    let declaration = toolset.get_tool("get_pets").unwrap().declaration();
    let parameters = declaration.parameters();

    assert_eq!(parameters["type"], "object");
    assert_eq!(parameters["properties"]["limit"]["type"], "integer");
    assert_eq!(parameters["properties"]["limit"]["default"], 20);
    assert_eq!(parameters["properties"]["status"]["type"], "string");
    assert_eq!(parameters["properties"]["status"]["nullable"], true);
    assert!(parameters.get("required").is_none());
    assert!(declaration.response().is_none());
}

#[test]
fn json_schema_declaration_carries_the_response() {
    let options = ToolsetOptions::default().with_declaration_format(DeclarationFormat::JsonSchema);
    let toolset = petstore(options);
    let declaration = toolset.get_tool("show_pet_by_id").unwrap().declaration();

    assert_eq!(declaration.parameters()["required"], json!(["pet_id"]));
    let response = declaration.response().expect("response schema");
    assert_eq!(response["type"], "object");
    assert_eq!(response["properties"]["id"]["type"], "integer");
    // `type: Any` is dropped rather than rejected.
    assert!(response["properties"]["tag"].get("type").is_none());
}

#[test]
fn object_request_body_is_flattened_into_arguments() {
    let toolset = petstore(ToolsetOptions::default());
    let tool = toolset.get_tool("create_pet").unwrap();
    let params = &tool.operation().parameters;

    let names: Vec<&str> = params.iter().map(|p| p.safe_name.as_str()).collect();
    assert_eq!(names, vec!["name", "type_"]);
    assert!(params.iter().all(|p| p.location == ParamLocation::Body));
    assert!(params[0].required);
    assert!(!params[1].required);
}

#[test]
fn recursive_schemas_compile() {
    let toolset = petstore(ToolsetOptions::default());
    let tool = toolset.get_tool("show_pet_by_id").unwrap();
    let returned = tool.operation().return_value.as_ref().unwrap();
    assert_eq!(returned.status, "default");
    assert!(returned.schema.as_ref().unwrap().is_object());
}

#[test]
fn compilation_is_deterministic() {
    let first = petstore(ToolsetOptions::default());
    let second = petstore(ToolsetOptions::default());
    for (a, b) in first.tools().iter().zip(second.tools()) {
        assert_eq!(a.declaration(), b.declaration());
    }
}

#[test]
fn tool_names_stay_unique_after_normalization() {
    let doc = json!({
        "openapi": "3.0.0",
        "info": {"title": "x", "version": "1"},
        "paths": {
            "/a": {"get": {"operationId": "getPet", "responses": {"200": {"description": "ok"}}}},
            "/b": {"get": {"operationId": "get_pet", "responses": {"200": {"description": "ok"}}}}
        }
    });
    let toolset =
        OpenApiToolSet::from_str("pets", &doc.to_string(), ToolsetOptions::default()).unwrap();
    let names: Vec<&str> = toolset.tools().iter().map(|tool| tool.name()).collect();
    assert_eq!(names, vec!["get_pet", "get_pet_0"]);
    assert_eq!(toolset.get_tool("get_pet_0").unwrap().operation().endpoint.path, "/b");
}

#[test]
fn external_reference_fails_before_any_tool_exists() {
    let doc = json!({
        "openapi": "3.0.0",
        "info": {"title": "x", "version": "1"},
        "paths": {"/things": {"get": {
            "responses": {"200": {
                "description": "ok",
                "content": {"application/json": {"schema": {"$ref": "other-file.yaml#/X"}}}
            }}
        }}}
    });
    let err = OpenApiToolSet::from_str("things", &doc.to_string(), ToolsetOptions::default())
        .unwrap_err();
    assert!(matches!(err, RestkitError::SpecResolution { ref reference, .. } if reference == "other-file.yaml#/X"));
}

#[test]
fn swagger_2_documents_are_rejected() {
    let err = OpenApiSpec::from_str(r#"{"swagger": "2.0", "paths": {"/a": {}}}"#).unwrap_err();
    assert!(matches!(err, RestkitError::SpecLoad { .. }));
}

#[test]
fn files_are_loaded_by_extension() {
    let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    yaml.write_all(PETSTORE.as_bytes()).unwrap();
    let toolset =
        OpenApiToolSet::from_file("petstore", yaml.path(), ToolsetOptions::default()).unwrap();
    assert_eq!(toolset.tools().len(), 3);

    let mut text = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    text.write_all(PETSTORE.as_bytes()).unwrap();
    let err = OpenApiToolSet::from_file("petstore", text.path(), ToolsetOptions::default())
        .unwrap_err();
    assert!(matches!(err, RestkitError::SpecLoad { .. }));
}

#[tokio::test]
async fn toolset_exposes_dyn_tools() {
    let toolset = petstore(ToolsetOptions::default());
    let tools = toolset.get_tools().await;
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[1].declaration().name(), "create_pet");
    toolset.close().await;
}
