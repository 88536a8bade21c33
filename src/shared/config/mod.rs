pub mod environment;

pub use environment::{
    get_database_filename, EnvFileOutcome, initialize_logging_system, load_environment_variables,
    DatabaseSettings, Environment, EnvironmentConfig, HttpSettings,
};
