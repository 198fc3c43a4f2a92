pub mod asset_repo;
pub mod assignment_repo;
pub mod audit_repo;
pub mod gate_repo;
pub mod location_repo;
pub mod request_repo;
pub mod role_repo;
pub mod user_repo;

pub use asset_repo::AssetRepo;
pub use assignment_repo::AssignmentRepo;
pub use audit_repo::AuditLogRepo;
pub use gate_repo::GateRepo;
pub use location_repo::LocationRepo;
pub use request_repo::RequestRepo;
pub use role_repo::RoleRepo;
pub use user_repo::UserRepo;
