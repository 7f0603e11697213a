use std::{env, env::VarError};

/// There's no real CLI for the worker, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 10] = [
        "RUST_LOG",
        "PAYIN_DATABASE_URL",
        "PAYIN_DISCOVERY_INTERVAL_SECS",
        "PAYIN_RECOVERY_INTERVAL_SECS",
        "PAYIN_RECOVERY_ENABLED",
        "PAYIN_STALE_AFTER_SECS",
        "PAYIN_JOB_POOL_CAPACITY",
        "PAYIN_DISCOVERY_PAGE_SIZE",
        "PAYIN_SHUTDOWN_GRACE_SECS",
        "PAYIN_PROVIDER_BASE_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
