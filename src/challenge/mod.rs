//! Challenge primitives shared by the validators (spec §4.2).

pub mod random;
pub mod request_token;

pub use random::{
    DefaultRandomValueValidator, RandomValueGenerator, RandomValueMatch, RandomValueValidator,
    check_entropy, find_random_value,
};
pub use request_token::{
    DefaultRequestTokenValidator, RequestTokenData, RequestTokenMatch, RequestTokenValidator,
    default_expected_token, find_request_token, validate_data as validate_request_token_data,
};
