use super::*;
use serial_test::serial;

fn base_overrides() -> ConfigOverrides {
    ConfigOverrides {
        job_path: PathBuf::from("job.json"),
        device_path: PathBuf::from("device.json"),
        verbose: false,
        log_format: None,
        state_dir: None,
    }
}

#[test]
#[serial]
fn cli_flag_wins_over_everything() {
    std::env::remove_var("RIGPIPE_LOG_FORMAT");
    std::env::remove_var("RIGPIPE_STATE_DIR");
    let overrides = ConfigOverrides {
        log_format: Some("json".to_string()),
        state_dir: Some(PathBuf::from("/tmp/explicit")),
        ..base_overrides()
    };
    let config = Config::resolve(overrides);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.state_dir, PathBuf::from("/tmp/explicit"));
}

#[test]
#[serial]
fn env_var_wins_over_default_when_no_cli_flag() {
    std::env::set_var("RIGPIPE_LOG_FORMAT", "json");
    std::env::set_var("RIGPIPE_STATE_DIR", "/tmp/from-env");
    let config = Config::resolve(base_overrides());
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.state_dir, PathBuf::from("/tmp/from-env"));
    std::env::remove_var("RIGPIPE_LOG_FORMAT");
    std::env::remove_var("RIGPIPE_STATE_DIR");
}

#[test]
#[serial]
fn falls_back_to_fixed_defaults_when_nothing_else_is_set() {
    std::env::remove_var("RIGPIPE_LOG_FORMAT");
    std::env::remove_var("RIGPIPE_STATE_DIR");
    std::env::remove_var("XDG_STATE_HOME");
    let config = Config::resolve(base_overrides());
    assert_eq!(config.log_format, LogFormat::Pretty);
    assert!(config.state_dir.to_string_lossy().contains("rigpipe"));
}

#[test]
#[serial]
fn unrecognized_log_format_falls_back_to_pretty() {
    std::env::remove_var("RIGPIPE_LOG_FORMAT");
    let overrides = ConfigOverrides {
        log_format: Some("xml".to_string()),
        ..base_overrides()
    };
    let config = Config::resolve(overrides);
    assert_eq!(config.log_format, LogFormat::Pretty);
}
