//! End-to-end multiplexer generation from `fabric.toml` text.

use aion_config::load_config_from_str;
use aion_diagnostics::{DiagnosticSink, Severity};
use aion_mux::{
    generate_mux_modules, CircuitLibrary, ModuleBody, ModuleId, ModuleRegistry, MuxError,
    MuxLibrary, Signal, MUX_SUMMARY,
};

const CELLS: &str = r#"
[fabric]
name = "muxes"

[circuits.tgate]
kind = "pass_gate"
ports = [
  { name = "in", kind = "input" },
  { name = "sel", kind = "input" },
  { name = "selb", kind = "input" },
  { name = "out", kind = "output" },
]

[circuits.tgate_lvt]
kind = "pass_gate"
ports = [
  { name = "in", kind = "input" },
  { name = "sel", kind = "input" },
  { name = "selb", kind = "input" },
  { name = "out", kind = "output" },
]

[circuits.mux2]
kind = "gate"
gate = "mux2"
ports = [
  { name = "in0", kind = "input" },
  { name = "in1", kind = "input" },
  { name = "s", kind = "input" },
  { name = "out", kind = "output" },
]

[circuits.inv]
kind = "inverter"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
]

[circuits.buf]
kind = "buffer"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
]
"#;

struct Generated {
    registry: ModuleRegistry,
    sink: DiagnosticSink,
    result: Result<aion_mux::GenerationSummary, MuxError>,
}

fn generate(models: &str) -> Generated {
    let config = load_config_from_str(&format!("{CELLS}\n{models}")).unwrap();
    let circuits = CircuitLibrary::from_config(&config).unwrap();
    let muxes = MuxLibrary::from_config(&circuits, &config).unwrap();
    let mut registry = ModuleRegistry::new();
    let sink = DiagnosticSink::new();
    let result = generate_mux_modules(&mut registry, &circuits, &muxes, &sink);
    Generated {
        registry,
        sink,
        result,
    }
}

fn module(reg: &ModuleRegistry, name: &str) -> ModuleId {
    reg.find_module(name)
        .unwrap_or_else(|| panic!("module {name} was not generated"))
}

/// Source assigned to `net[index]` in a module, if any.
fn assigned(reg: &ModuleRegistry, id: ModuleId, net: &str, index: usize) -> Option<Signal> {
    let target = reg.bit(net, index);
    reg.module(id)
        .assigns()
        .iter()
        .find(|a| a.target == target)
        .map(|a| a.source)
}

fn port_width(reg: &ModuleRegistry, id: ModuleId, name: &str) -> usize {
    reg.module(id).port(reg.intern(name)).unwrap().width
}

#[test]
fn flat_eight_input_pass_gate_mux() {
    let g = generate(
        r#"
[circuits.mux_1level]
kind = "mux"
structure = "one_level"
pass_gate = "tgate"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "sram", kind = "sram" },
]

[[muxes]]
model = "mux_1level"
sizes = [8]
"#,
    );
    let summary = g.result.unwrap();
    assert_eq!(summary.branch_modules, 1);
    assert_eq!(summary.mux_modules, 1);
    let reg = &g.registry;

    let branch = module(reg, "mux_tgate_branch_size8");
    let gates = reg.module(branch).instances();
    assert_eq!(gates.len(), 8);
    let sel = reg.intern("sel");
    let mut mems: Vec<Signal> = gates
        .iter()
        .map(|i| i.binding(sel).unwrap()[0])
        .collect();
    mems.dedup();
    assert_eq!(mems.len(), 8);
    assert_eq!(mems[7], reg.bit("mem", 7));

    let top = module(reg, "mux_1level_size8");
    assert_eq!(port_width(reg, top, "in"), 8);
    assert_eq!(port_width(reg, top, "sram"), 8);
    assert_eq!(port_width(reg, top, "sram_inv"), 8);
    let instances = reg.module(top).instances();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].module, branch);
    assert_eq!(
        instances[0].binding(reg.intern("mem")).unwrap(),
        reg.bus("sram", 8).as_slice()
    );
    assert_eq!(assigned(reg, top, "out", 0), Some(reg.bit("mux_l1_in", 0)));
    assert_eq!(assigned(reg, top, "mux_l0_in", 3), Some(reg.bit("in", 3)));

    let diags = g.sink.take_all();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, MUX_SUMMARY);
    assert_eq!(
        diags[0].message,
        "generated 1 branch modules and 1 multiplexer modules"
    );
}

#[test]
fn equal_fan_in_shares_one_branch_across_muxes() {
    let g = generate(
        r#"
[circuits.mux_a]
kind = "mux"
pass_gate = "tgate"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "sram", kind = "sram" },
]

[circuits.mux_b]
kind = "mux"
pass_gate = "tgate"
ports = [
  { name = "d", kind = "input" },
  { name = "q", kind = "output" },
  { name = "cfg", kind = "sram" },
]

[[muxes]]
model = "mux_a"
sizes = [4, 8]

[[muxes]]
model = "mux_b"
sizes = [4]
"#,
    );
    let summary = g.result.unwrap();
    assert_eq!(summary.branch_modules, 1);
    assert_eq!(summary.mux_modules, 3);
    let reg = &g.registry;

    let branch = module(reg, "mux_tgate_branch_size2");
    let count = reg.iter().filter(|(_, m)| reg.resolve(m.name()) == "mux_tgate_branch_size2").count();
    assert_eq!(count, 1);
    for (name, nodes) in [("mux_a_size4", 3), ("mux_a_size8", 7), ("mux_b_size4", 3)] {
        let top = module(reg, name);
        assert_eq!(reg.module(top).children(), &[(branch, nodes)]);
    }
}

#[test]
fn constant_input_is_tied_not_wired() {
    let g = generate(
        r#"
[circuits.mux_const]
kind = "mux"
pass_gate = "tgate"
input_buffer = "inv"
const_input = 1
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "sram", kind = "sram" },
]

[[muxes]]
model = "mux_const"
sizes = [4]
"#,
    );
    g.result.unwrap();
    let reg = &g.registry;
    let top = module(reg, "mux_const_size4");
    let inv = module(reg, "inv");

    assert_eq!(port_width(reg, top, "in"), 4);
    assert_eq!(
        reg.module(top).wire(reg.intern("mux_l0_in")).unwrap().width,
        5
    );
    assert_eq!(assigned(reg, top, "mux_l0_in", 4), Some(Signal::Const(true)));

    let in_port = reg.intern("in");
    let buffered: Vec<_> = reg
        .module(top)
        .instances()
        .iter()
        .filter(|i| i.module == inv)
        .map(|i| i.binding(in_port).unwrap()[0])
        .collect();
    assert_eq!(buffered, reg.bus("in", 4));
    assert!(!reg
        .module(top)
        .assigns()
        .iter()
        .any(|a| matches!(a.source, Signal::Bit { net, .. } if net == in_port)));
}

#[test]
fn standard_cell_tree() {
    let g = generate(
        r#"
[circuits.mux_cells]
kind = "mux"
pass_gate = "mux2"
output_buffer = "buf"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "sram", kind = "sram" },
]

[[muxes]]
model = "mux_cells"
sizes = [4]
"#,
    );
    let summary = g.result.unwrap();
    assert_eq!(summary.branch_modules, 1);
    let reg = &g.registry;
    let top = module(reg, "mux_cells_size4");
    let cell = module(reg, "mux2");
    let buf = module(reg, "buf");
    assert_eq!(reg.module(top).children(), &[(cell, 3), (buf, 1)]);

    // First level-1 node: input 1 is picked when the select bit is 0.
    let first = &reg.module(top).instances()[0];
    assert_eq!(first.binding(reg.intern("in0")).unwrap(), &[reg.bit("mux_l0_in", 1)]);
    assert_eq!(first.binding(reg.intern("in1")).unwrap(), &[reg.bit("mux_l0_in", 0)]);
    assert_eq!(first.binding(reg.intern("s")).unwrap(), &[reg.bit("sram", 0)]);
    assert_eq!(assigned(reg, top, "out", 0), None);
}

#[test]
fn resistive_tree_gets_an_extra_line_pair_per_level() {
    let g = generate(
        r#"
[circuits.mux_rram]
kind = "mux"
technology = "rram"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "bl", kind = "blb" },
  { name = "wl", kind = "wl" },
  { name = "prog_en", kind = "input", global = true },
]

[[muxes]]
model = "mux_rram"
sizes = [4]
"#,
    );
    g.result.unwrap();
    let reg = &g.registry;

    let branch = module(reg, "mux_rram_branch_size2");
    assert_eq!(port_width(reg, branch, "bl"), 3);
    let te = module(reg, "PROG_TE");
    let be = module(reg, "PROG_BE");
    assert_eq!(reg.module(branch).children(), &[(te, 2), (be, 1)]);

    // Two one-hot levels of two bits each, plus one extra pair per level.
    let top = module(reg, "mux_rram_size4");
    assert_eq!(port_width(reg, top, "bl"), 6);
    assert_eq!(port_width(reg, top, "wl"), 6);
    assert_eq!(port_width(reg, top, "prog_en"), 1);

    let bl = reg.intern("bl");
    let instances = reg.module(top).instances();
    assert_eq!(
        instances[1].binding(bl).unwrap(),
        &[reg.bit("bl", 0), reg.bit("bl", 1), reg.bit("bl", 4)]
    );
    assert_eq!(
        instances[2].binding(bl).unwrap(),
        &[reg.bit("bl", 2), reg.bit("bl", 3), reg.bit("bl", 5)]
    );
}

#[test]
fn resistive_lut_is_refused() {
    let g = generate(
        r#"
[circuits.lut_rram]
kind = "lut"
technology = "rram"
ports = [
  { name = "in", kind = "input", size = 2 },
  { name = "out", kind = "output" },
  { name = "bl", kind = "blb" },
  { name = "wl", kind = "wl" },
]

[[muxes]]
model = "lut_rram"
sizes = [4]
"#,
    );
    assert!(matches!(g.result, Err(MuxError::Unsupported { .. })));
    let diags = g.sink.take_all();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert!(g.sink.diagnostics().is_empty());
}

#[test]
fn local_decoders_drive_each_level() {
    let g = generate(
        r#"
[circuits.mux_dec]
kind = "mux"
structure = "multi_level"
num_levels = 2
local_decoder = true
pass_gate = "tgate"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "sram", kind = "sram" },
]

[[muxes]]
model = "mux_dec"
sizes = [16]
"#,
    );
    g.result.unwrap();
    let reg = &g.registry;
    let top = module(reg, "mux_dec_size16");
    let decoder = module(reg, "decoder2to4");

    // Two levels of four one-hot bits: two 2-bit addresses.
    assert_eq!(port_width(reg, top, "sram"), 4);
    assert!(reg.module(top).port(reg.intern("sram_inv")).is_none());
    assert_eq!(reg.module(top).children()[0], (decoder, 2));

    let instances = reg.module(top).instances();
    assert_eq!(
        instances[1].binding(reg.intern("addr")).unwrap(),
        &[reg.bit("sram", 2), reg.bit("sram", 3)]
    );
    let last = instances.last().unwrap();
    assert_eq!(
        last.binding(reg.intern("mem_inv")).unwrap(),
        reg.bus("data_inv", 8)[4..].to_vec().as_slice()
    );
}

#[test]
fn intermediate_buffers_split_the_level_bus() {
    let g = generate(
        r#"
[circuits.mux_ib]
kind = "mux"
pass_gate = "tgate"
intermediate_buffer = "buf"
intermediate_buffer_map = "-1-"
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "sram", kind = "sram" },
]

[[muxes]]
model = "mux_ib"
sizes = [4]
"#,
    );
    g.result.unwrap();
    let reg = &g.registry;
    let top = module(reg, "mux_ib_size4");
    let buf = module(reg, "buf");
    assert!(reg.module(top).wire(reg.intern("mux_l1_in_buf")).is_some());
    assert!(reg.module(top).wire(reg.intern("mux_l2_in_buf")).is_none());

    let children = reg.module(top).children();
    assert!(children.contains(&(buf, 2)));
    let last = reg.module(top).instances().last().unwrap();
    assert_eq!(
        last.binding(reg.intern("in")).unwrap(),
        &[reg.bit("mux_l1_in_buf", 0), reg.bit("mux_l1_in_buf", 1)]
    );
}

#[test]
fn fracturable_lut_taps_inner_levels() {
    let g = generate(
        r#"
[circuits.lut3]
kind = "lut"
pass_gate = "tgate"
fracturable = true
ports = [
  { name = "in", kind = "input", size = 3 },
  { name = "lut2_out", kind = "output", size = 2, frac_level = 2, output_masks = [0, 1] },
  { name = "lut3_out", kind = "output" },
  { name = "sram", kind = "sram", size = 8 },
  { name = "mode", kind = "sram", mode_select = true },
]

[[muxes]]
model = "lut3"
sizes = [8]
"#,
    );
    g.result.unwrap();
    let reg = &g.registry;
    let top = module(reg, "lut3_mux");
    assert_eq!(port_width(reg, top, "sram"), 8);
    assert_eq!(port_width(reg, top, "in"), 3);
    assert_eq!(port_width(reg, top, "in_inv"), 3);
    assert_eq!(assigned(reg, top, "lut2_out", 1), Some(reg.bit("mux_l2_in", 1)));
    assert_eq!(assigned(reg, top, "lut3_out", 0), Some(reg.bit("mux_l3_in", 0)));
    assert_eq!(assigned(reg, top, "mux_l0_in", 7), Some(reg.bit("sram", 7)));
}

#[test]
fn different_pass_gates_cannot_share_a_branch() {
    let g = generate(
        r#"
[circuits.mux_a]
kind = "mux"
pass_gate = "tgate"
ports = [{ name = "in", kind = "input" }, { name = "out", kind = "output" }, { name = "sram", kind = "sram" }]

[circuits.mux_b]
kind = "mux"
pass_gate = "tgate_lvt"
ports = [{ name = "in", kind = "input" }, { name = "out", kind = "output" }, { name = "sram", kind = "sram" }]

[[muxes]]
model = "mux_a"
sizes = [2]

[[muxes]]
model = "mux_b"
sizes = [2]
"#,
    );
    assert!(matches!(g.result, Err(MuxError::BranchConflict { .. })));
    assert!(g.sink.has_errors());
}

#[test]
fn behavioral_branch_has_a_select_table() {
    let g = generate(
        r#"
[circuits.mux_rtl]
kind = "mux"
structure = "one_level"
structural = false
ports = [
  { name = "in", kind = "input" },
  { name = "out", kind = "output" },
  { name = "sram", kind = "sram" },
]

[[muxes]]
model = "mux_rtl"
sizes = [3]
"#,
    );
    g.result.unwrap();
    let reg = &g.registry;
    let branch = module(reg, "mux_tgate_branch_size3");
    assert!(reg.module(branch).instances().is_empty());
    let ModuleBody::Behavioral(cases) = reg.module(branch).body() else {
        panic!("expected a behavioral branch");
    };
    let codes: Vec<_> = cases.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["100", "010", "001"]);
}

#[test]
fn generating_twice_reuses_every_module() {
    let text = format!(
        "{CELLS}\n[circuits.m]\nkind = \"mux\"\npass_gate = \"tgate\"\nports = [\
         {{ name = \"in\", kind = \"input\" }}, {{ name = \"out\", kind = \"output\" }}, \
         {{ name = \"sram\", kind = \"sram\" }}]\n[[muxes]]\nmodel = \"m\"\nsizes = [4, 6]\n"
    );
    let config = load_config_from_str(&text).unwrap();
    let circuits = CircuitLibrary::from_config(&config).unwrap();
    let muxes = MuxLibrary::from_config(&circuits, &config).unwrap();
    let mut registry = ModuleRegistry::new();
    let sink = DiagnosticSink::new();

    let first = generate_mux_modules(&mut registry, &circuits, &muxes, &sink).unwrap();
    let modules = registry.len();
    let second = generate_mux_modules(&mut registry, &circuits, &muxes, &sink).unwrap();
    assert_eq!(first.mux_modules, 2);
    assert_eq!(second.mux_modules, 0);
    assert_eq!(registry.len(), modules);
}

#[test]
fn failed_pass_leaves_no_half_wired_module() {
    let text = format!(
        r#"{CELLS}
[circuits.wide_buf]
kind = "buffer"
ports = [
  {{ name = "a", kind = "input" }},
  {{ name = "b", kind = "input" }},
  {{ name = "y", kind = "output" }},
]

[circuits.good]
kind = "mux"
pass_gate = "tgate"
ports = [
  {{ name = "in", kind = "input" }},
  {{ name = "out", kind = "output" }},
  {{ name = "sram", kind = "sram" }},
]

[circuits.bad]
kind = "mux"
pass_gate = "tgate"
output_buffer = "wide_buf"
ports = [
  {{ name = "in", kind = "input" }},
  {{ name = "out", kind = "output" }},
  {{ name = "sram", kind = "sram" }},
]

[[muxes]]
model = "good"
sizes = [4]

[[muxes]]
model = "bad"
sizes = [4]
"#
    );
    let config = load_config_from_str(&text).unwrap();
    let circuits = CircuitLibrary::from_config(&config).unwrap();
    let all = MuxLibrary::from_config(&circuits, &config).unwrap();
    let mut good_only = MuxLibrary::new();
    good_only
        .add_mux(&circuits, circuits.find("good").unwrap(), 4)
        .unwrap();

    let mut registry = ModuleRegistry::new();
    let sink = DiagnosticSink::new();
    generate_mux_modules(&mut registry, &circuits, &good_only, &sink).unwrap();
    let before = registry.len();

    // The output buffer is refused only after the node instances exist.
    for _ in 0..2 {
        let err = generate_mux_modules(&mut registry, &circuits, &all, &sink).unwrap_err();
        assert!(matches!(err, MuxError::PortCount { .. }), "{err}");
        assert_eq!(registry.find_module("bad_size4"), None);
        assert_eq!(registry.find_module("wide_buf"), None);
        assert!(registry.find_module("good_size4").is_some());
        assert_eq!(registry.len(), before);
    }
    assert_eq!(sink.error_count(), 2);
}

#[test]
fn output_past_the_last_level_is_refused_before_generation() {
    let text = format!(
        "{CELLS}\n[circuits.m]\nkind = \"mux\"\npass_gate = \"tgate\"\nports = [\
         {{ name = \"in\", kind = \"input\" }}, \
         {{ name = \"out\", kind = \"output\", frac_level = 7 }}, \
         {{ name = \"sram\", kind = \"sram\" }}]\n[[muxes]]\nmodel = \"m\"\nsizes = [4]\n"
    );
    let config = load_config_from_str(&text).unwrap();
    let circuits = CircuitLibrary::from_config(&config).unwrap();
    let err = MuxLibrary::from_config(&circuits, &config).unwrap_err();
    assert!(matches!(err, MuxError::OutputOutOfRange { level: 7, .. }));
}
