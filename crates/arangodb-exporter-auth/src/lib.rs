pub mod jwt;
pub mod token;

pub use token::{
    JwtFileProvider, JwtSecretProvider, NoAuthentication, TokenProvider, token_provider,
};
