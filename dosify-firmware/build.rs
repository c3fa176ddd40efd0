//! Build script for dosify-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates dispenser.toml at compile time
//! - Generates board_config.rs from it

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A validated integer setting: section, key, and accepted range
struct Setting {
    section: &'static str,
    key: &'static str,
    min: i64,
    max: i64,
    const_name: &'static str,
    const_type: &'static str,
}

const SETTINGS: &[Setting] = &[
    Setting {
        section: "motor",
        key: "pwm_frequency_hz",
        min: 10,
        max: 100_000,
        const_name: "PWM_FREQUENCY_HZ",
        const_type: "u32",
    },
    Setting {
        section: "motor",
        key: "pwm_resolution_bits",
        min: 1,
        max: 16,
        const_name: "PWM_RESOLUTION_BITS",
        const_type: "u8",
    },
    Setting {
        section: "motor",
        key: "ramp_step",
        min: 1,
        max: 65_535,
        const_name: "RAMP_STEP",
        const_type: "u16",
    },
    Setting {
        section: "motor",
        key: "ramp_interval_ms",
        min: 0,
        max: 1_000,
        const_name: "RAMP_INTERVAL_MS",
        const_type: "u32",
    },
    Setting {
        section: "motor",
        key: "default_intensity",
        min: 0,
        max: 100,
        const_name: "DEFAULT_INTENSITY",
        const_type: "u8",
    },
    Setting {
        section: "motor",
        key: "default_max_runtime_s",
        min: 30,
        max: 600,
        const_name: "DEFAULT_MAX_RUNTIME_S",
        const_type: "u32",
    },
    Setting {
        section: "watchdog",
        key: "poll_interval_ms",
        min: 10,
        max: 1_000,
        const_name: "WATCHDOG_POLL_MS",
        const_type: "u64",
    },
];

fn main() {
    setup_linker();
    let config = validate_config();
    generate_board_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate dispenser.toml and return the parsed document
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=dispenser.toml");

    let config_path = Path::new("dispenser.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: dispenser.toml not found!                                ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a dispenser.toml board configuration.     ║\n\
            ║  Please create one in the dosify-firmware directory.             ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read dispenser.toml                            ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in dispenser.toml                    ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    validate_settings(&config);

    println!("cargo:warning=dispenser.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check every known setting is present, an integer, and in range
fn validate_settings(config: &toml::Value) {
    let mut errors = Vec::new();

    for setting in SETTINGS {
        match lookup(config, setting) {
            Some(toml::Value::Integer(v)) => {
                if *v < setting.min || *v > setting.max {
                    errors.push(format!(
                        "[{}] {} must be {}-{}",
                        setting.section, setting.key, setting.min, setting.max
                    ));
                }
            }
            Some(_) => errors.push(format!(
                "[{}] {} must be an integer",
                setting.section, setting.key
            )),
            None => errors.push(format!("[{}] missing '{}'", setting.section, setting.key)),
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid dispenser configuration                          ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
}

fn lookup<'a>(config: &'a toml::Value, setting: &Setting) -> Option<&'a toml::Value> {
    config.get(setting.section)?.get(setting.key)
}

/// Write the validated settings as constants into OUT_DIR/board_config.rs
fn generate_board_config(config: &toml::Value) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("board_config.rs")).unwrap();

    writeln!(f, "// Generated from dispenser.toml by build.rs").unwrap();
    for setting in SETTINGS {
        let value = lookup(config, setting)
            .and_then(|v| v.as_integer())
            .unwrap();
        writeln!(
            f,
            "pub const {}: {} = {};",
            setting.const_name, setting.const_type, value
        )
        .unwrap();
    }
}
