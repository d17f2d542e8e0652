//! Project configuration read from `hwtk.toml` on disk.

use hwtk_config::{load_config, ConfigError, Period, CONFIG_FILE_NAME};
use hwtk_conformance::{leaf, run_elaboration, wrapper};
use hwtk_rtl::{HdlType, Netlist, Value};
use hwtk_sim::{SimError, Simulator};
use std::fs;
use tempfile::TempDir;

fn project(toml: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), toml).unwrap();
    dir
}

#[test]
fn missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.elaborate.bridge_prefix, "sig_");
    assert_eq!(config.sim.max_deltas, 10_000);
}

#[test]
fn naming_settings_shape_bridge_nets() {
    let dir = project(
        r#"
[elaborate]
bridge_prefix = "br_"
name_separator = "__"
architecture_name = "structural"
"#,
    );
    let config = load_config(dir.path()).unwrap();
    let inv = leaf("inv", "inv.vhd").unwrap();
    let mut top = wrapper("top", &inv).unwrap();
    let run = run_elaboration(&mut top, &config.elaborate).unwrap();
    let vhdl = run.top().unwrap().to_vhdl();
    assert!(vhdl.contains("br_u0__a <= a;"));
    assert!(vhdl.contains("ARCHITECTURE structural OF top IS"));
}

#[test]
fn sim_settings_are_honored() {
    let dir = project(
        r#"
[sim]
max_deltas = 2
clock_period = "4ns"
"#,
    );
    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.sim.clock_period, Period::from_ns(4));

    let mut n = Netlist::new();
    let x = n.sig_with_default("x", HdlType::Bit, Value::bit(false)).unwrap();
    let mut tail = x;
    for _ in 0..3 {
        tail = n.op_not(tail).unwrap();
    }
    assert_ne!(tail, x);
    let mut sim = Simulator::new(n, config.sim).unwrap();
    let err = sim.write(x, Value::bit(true)).unwrap_err();
    assert_eq!(err, SimError::DeltaCycleLimit { ps: 0, max_deltas: 2 });
}

#[test]
fn invalid_settings_are_rejected() {
    let dir = project("[elaborate]\nname_separator = \"\"\n");
    let err = load_config(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { ref key, .. } if key == "elaborate.name_separator"));

    let dir = project("[sim\nmax_deltas = 1\n");
    assert!(matches!(load_config(dir.path()), Err(ConfigError::ParseError(_))));
}
