//! OpenAPI tool integration.
//!
//! Compiles an OpenAPI 3.x document into one callable tool per operation:
//! references are inlined ([`SpecResolver`]), schema types normalized
//! ([`SchemaSanitizer`]), operations enumerated ([`OperationCollector`]) and
//! turned into typed signatures ([`OperationParser`]). At call time a
//! [`RestApiTool`] prepares credentials, assembles the request with
//! [`RequestBuilder`] and performs it.
//!
//! # Example
//! ```no_run
//! use restkit::tools::auth::AuthCredential;
//! use restkit::tools::openapi::{OpenApiToolSet, ToolsetOptions};
//! use restkit::tools::BaseToolset;
//!
//! # async fn run() -> restkit::RestkitResult<()> {
//! let options = ToolsetOptions::default()
//!     .with_auth_scheme_name("apiKey")
//!     .with_auth_credential(AuthCredential::api_key("my-api-key"));
//!
//! let toolset = OpenApiToolSet::from_file("petstore_api", "specs/petstore.yaml", options)?;
//! let tools = toolset.get_tools().await;
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod naming;
pub mod operation_tool;
pub mod parser;
pub mod request;
pub mod resolver;
pub mod sanitizer;
pub mod schema;
pub mod spec;
pub mod toolset;

pub use collector::{HttpMethod, OperationCollector, OperationEndpoint, ParsedOperation};
pub use operation_tool::{
    DeclarationFormat, HeaderProvider, HeaderProviderFn, RestApiTool, ToolRuntime,
    PENDING_AUTH_MESSAGE,
};
pub use parser::{
    ApiParameter, BodyShape, OperationParser, OperationSignature, ParamLocation,
    RequestBodySpec, ReturnValue, SecurityRequirement,
};
pub use request::{BuiltRequest, RequestBody, RequestBuilder};
pub use resolver::SpecResolver;
pub use sanitizer::SchemaSanitizer;
pub use schema::{Combinator, ScalarKind, SchemaMeta, SchemaNode};
pub use spec::OpenApiSpec;
pub use toolset::{OpenApiToolSet, ToolsetOptions};
