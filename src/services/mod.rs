pub mod company;
pub mod identity;
pub mod route_policy;
