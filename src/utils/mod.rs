pub mod path_validator;
