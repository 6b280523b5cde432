pub mod handle;
pub mod model;
pub mod repository;
pub mod repository_pg;
pub mod rollback;
pub mod route;
pub mod schema;
pub mod service;
pub mod storage;
pub mod validator;

pub use repository_pg::FilePgRepository;
pub use service::FileUploadService;
