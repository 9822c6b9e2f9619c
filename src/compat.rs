//! Send/Sync shims so the crate also builds for single-threaded `wasm32-wasip1`.

#[cfg(all(target_os = "wasi", target_env = "p1"))]
pub trait MaybeSend {}

#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
pub trait MaybeSend: Send {}

#[cfg(all(target_os = "wasi", target_env = "p1"))]
impl<T: ?Sized> MaybeSend for T {}

#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
impl<T: Send + ?Sized> MaybeSend for T {}

#[cfg(all(target_os = "wasi", target_env = "p1"))]
pub trait MaybeSync {}

#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
pub trait MaybeSync: Sync {}

#[cfg(all(target_os = "wasi", target_env = "p1"))]
impl<T: ?Sized> MaybeSync for T {}

#[cfg(not(all(target_os = "wasi", target_env = "p1")))]
impl<T: Sync + ?Sized> MaybeSync for T {}
