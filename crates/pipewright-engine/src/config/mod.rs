pub mod parser;
pub mod validator;
