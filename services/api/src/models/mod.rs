//! API service models

pub mod mahasiswa;
pub mod token;
pub mod user;

// Re-export for convenience
pub use mahasiswa::{
    Mahasiswa, MahasiswaFields, StudentListParams, StudentListQuery, StudentStatus,
};
pub use token::{NewToken, Token};
pub use user::{NewUser, PublicUser, User};
