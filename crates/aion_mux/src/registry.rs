//! Registry of generated modules.
//!
//! Every generator call receives the registry by `&mut` and finds or creates
//! modules by name, so generating the same module twice is a no-op. Port
//! bindings and assignments are checked as they are added: a module whose
//! wiring does not fit its ports is rejected before it is recorded.

use crate::error::MuxError;
use crate::ids::ModuleId;
use aion_common::{Ident, Interner};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role of a module port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModulePortKind {
    /// Device-wide signal, not wired per instance.
    Global,
    /// Input.
    Input,
    /// Output.
    Output,
    /// Bidirectional.
    Inout,
}

/// A port of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePort {
    /// Port name.
    pub name: Ident,
    /// Width in bits.
    pub width: usize,
    /// Role.
    pub kind: ModulePortKind,
}

/// An internal bus of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    /// Wire name.
    pub name: Ident,
    /// Width in bits.
    pub width: usize,
}

/// One bit of a port or wire of the enclosing module, or a constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Bit `index` of the net `net`.
    Bit {
        /// Port or wire name.
        net: Ident,
        /// Bit index.
        index: usize,
    },
    /// A constant logic value.
    Const(bool),
}

/// Binding of one port of an instantiated module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port of the instantiated module.
    pub port: Ident,
    /// Parent bits, one per port bit, LSB first.
    pub bits: Vec<Signal>,
}

/// An instance of a child module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    /// The instantiated module.
    pub module: ModuleId,
    /// Instance name, unique in the parent.
    pub name: Ident,
    /// Port bindings.
    pub bindings: Vec<PortBinding>,
}

impl Instance {
    /// Bits bound to a port, if it is bound.
    pub fn binding(&self, port: Ident) -> Option<&[Signal]> {
        self.bindings
            .iter()
            .find(|b| b.port == port)
            .map(|b| b.bits.as_slice())
    }
}

/// A continuous assignment `target = source`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assign {
    /// Driven bit.
    pub target: Signal,
    /// Driving bit or constant.
    pub source: Signal,
}

/// One row of a behavioral select table: when the memory bits equal
/// `code`, the output follows input `input`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectCase {
    /// Memory value, one `0`/`1` character per bit, bit 0 first.
    pub code: String,
    /// Selected input index.
    pub input: usize,
}

/// What a module's contents are.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleBody {
    /// Defined outside the generator: a primitive cell or a decoder.
    Leaf,
    /// Instances and assignments.
    #[default]
    Structural,
    /// A select table over the memory bits.
    Behavioral(Vec<SelectCase>),
}

/// A generated module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Module {
    name: Ident,
    ports: Vec<ModulePort>,
    wires: Vec<Wire>,
    instances: Vec<Instance>,
    assigns: Vec<Assign>,
    children: Vec<(ModuleId, usize)>,
    body: ModuleBody,
}

impl Module {
    fn new(name: Ident) -> Self {
        Self {
            name,
            ports: Vec::new(),
            wires: Vec::new(),
            instances: Vec::new(),
            assigns: Vec::new(),
            children: Vec::new(),
            body: ModuleBody::default(),
        }
    }

    /// Module name.
    pub fn name(&self) -> Ident {
        self.name
    }

    /// Ports, in declaration order.
    pub fn ports(&self) -> &[ModulePort] {
        &self.ports
    }

    /// Looks up a port.
    pub fn port(&self, name: Ident) -> Option<&ModulePort> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Internal buses.
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Looks up a wire.
    pub fn wire(&self, name: Ident) -> Option<&Wire> {
        self.wires.iter().find(|w| w.name == name)
    }

    /// Child instances, in creation order.
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Continuous assignments.
    pub fn assigns(&self) -> &[Assign] {
        &self.assigns
    }

    /// Child modules in first-use order, with their instance counts.
    pub fn children(&self) -> &[(ModuleId, usize)] {
        &self.children
    }

    /// Contents.
    pub fn body(&self) -> &ModuleBody {
        &self.body
    }

    fn net_width(&self, net: Ident) -> Option<usize> {
        self.port(net)
            .map(|p| p.width)
            .or_else(|| self.wire(net).map(|w| w.width))
    }
}

/// A point in a registry's history, from [`ModuleRegistry::mark`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryMark(usize);

/// Every module generated so far, with its string table.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    names: Interner,
    modules: Vec<Module>,
    by_name: HashMap<Ident, ModuleId>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a name.
    pub fn intern(&self, name: &str) -> Ident {
        self.names.intern(name)
    }

    /// Resolves an interned name.
    pub fn resolve(&self, name: Ident) -> &str {
        self.names.resolve(name)
    }

    /// Bit `index` of the net `net`.
    pub fn bit(&self, net: &str, index: usize) -> Signal {
        Signal::Bit {
            net: self.intern(net),
            index,
        }
    }

    /// Bits `0..width` of the net `net`.
    pub fn bus(&self, net: &str, width: usize) -> Vec<Signal> {
        let net = self.intern(net);
        (0..width).map(|index| Signal::Bit { net, index }).collect()
    }

    /// Looks up a module by name.
    pub fn find_module(&self, name: &str) -> Option<ModuleId> {
        self.names
            .get(name)
            .and_then(|ident| self.by_name.get(&ident))
            .copied()
    }

    /// Returns the module named `name`, creating an empty one if needed.
    /// The flag is `true` when the module was created by this call.
    pub fn find_or_create_module(&mut self, name: &str) -> (ModuleId, bool) {
        if let Some(id) = self.find_module(name) {
            return (id, false);
        }
        let ident = self.intern(name);
        let id = ModuleId::from_index(self.modules.len());
        self.modules.push(Module::new(ident));
        self.by_name.insert(ident, id);
        (id, true)
    }

    /// Records the current set of modules for a later [`rollback`].
    ///
    /// [`rollback`]: ModuleRegistry::rollback
    pub fn mark(&self) -> RegistryMark {
        RegistryMark(self.modules.len())
    }

    /// Removes every module created since `mark`.
    ///
    /// Generation only fills modules it has just created, so modules older
    /// than the mark are left exactly as they were.
    pub fn rollback(&mut self, mark: RegistryMark) {
        let keep = mark.0.min(self.modules.len());
        for module in self.modules.drain(keep..) {
            self.by_name.remove(&module.name);
        }
    }

    /// Returns the module.
    ///
    /// # Panics
    ///
    /// Panics if the ID is not from this registry.
    pub fn module(&self, id: ModuleId) -> &Module {
        match self.modules.get(id.index()) {
            Some(module) => module,
            None => panic!("module {id} is not in the registry"),
        }
    }

    fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        match self.modules.get_mut(id.index()) {
            Some(module) => module,
            None => panic!("module {id} is not in the registry"),
        }
    }

    /// Name of a module.
    pub fn module_name(&self, id: ModuleId) -> &str {
        self.resolve(self.module(id).name)
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All modules with their IDs, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId::from_index(i), m))
    }

    fn duplicate_check(&self, id: ModuleId, name: Ident) -> Result<(), MuxError> {
        if self.module(id).net_width(name).is_some() {
            return Err(MuxError::DuplicateNet {
                module: self.module_name(id).to_string(),
                net: self.resolve(name).to_string(),
            });
        }
        Ok(())
    }

    /// Declares a port.
    pub fn add_port(
        &mut self,
        id: ModuleId,
        name: &str,
        width: usize,
        kind: ModulePortKind,
    ) -> Result<(), MuxError> {
        let name = self.intern(name);
        self.duplicate_check(id, name)?;
        self.module_mut(id).ports.push(ModulePort { name, width, kind });
        Ok(())
    }

    /// Declares an internal bus.
    pub fn add_wire(&mut self, id: ModuleId, name: &str, width: usize) -> Result<(), MuxError> {
        let name = self.intern(name);
        self.duplicate_check(id, name)?;
        self.module_mut(id).wires.push(Wire { name, width });
        Ok(())
    }

    /// Records that `parent` instantiates `child` once more.
    pub fn add_child_module(&mut self, parent: ModuleId, child: ModuleId) {
        let children = &mut self.module_mut(parent).children;
        match children.iter_mut().find(|(c, _)| *c == child) {
            Some((_, count)) => *count += 1,
            None => children.push((child, 1)),
        }
    }

    fn check_signal(&self, id: ModuleId, signal: Signal) -> Result<(), MuxError> {
        let Signal::Bit { net, index } = signal else {
            return Ok(());
        };
        match self.module(id).net_width(net) {
            Some(width) if index < width => Ok(()),
            _ => Err(MuxError::UnknownNet {
                module: self.module_name(id).to_string(),
                net: self.resolve(net).to_string(),
                index,
            }),
        }
    }

    /// Instantiates `child` in `parent` and returns the instance index.
    ///
    /// Every binding must name a port of `child`, match its width, and
    /// refer to nets of `parent`. Ports left out stay unconnected.
    pub fn add_instance(
        &mut self,
        parent: ModuleId,
        child: ModuleId,
        bindings: Vec<(&str, Vec<Signal>)>,
    ) -> Result<usize, MuxError> {
        let mut resolved = Vec::with_capacity(bindings.len());
        for (port_name, bits) in bindings {
            let port = self.intern(port_name);
            let width = match self.module(child).port(port) {
                Some(p) => p.width,
                None => {
                    return Err(MuxError::UnknownPort {
                        module: self.module_name(child).to_string(),
                        port: port_name.to_string(),
                    })
                }
            };
            if width != bits.len() {
                return Err(MuxError::WidthMismatch {
                    module: self.module_name(child).to_string(),
                    port: port_name.to_string(),
                    expected: width,
                    found: bits.len(),
                });
            }
            for bit in &bits {
                self.check_signal(parent, *bit)?;
            }
            resolved.push(PortBinding { port, bits });
        }

        let count = self
            .module(parent)
            .children
            .iter()
            .find(|(c, _)| *c == child)
            .map_or(0, |(_, n)| *n);
        let name = self.intern(&format!("{}_{}_", self.module_name(child), count));
        self.add_child_module(parent, child);

        let instances = &mut self.module_mut(parent).instances;
        instances.push(Instance {
            module: child,
            name,
            bindings: resolved,
        });
        Ok(instances.len() - 1)
    }

    /// Adds `target = source` to a module.
    pub fn add_assign(&mut self, id: ModuleId, target: Signal, source: Signal) -> Result<(), MuxError> {
        if let Signal::Const(_) = target {
            return Err(MuxError::UnknownNet {
                module: self.module_name(id).to_string(),
                net: "<constant>".to_string(),
                index: 0,
            });
        }
        self.check_signal(id, target)?;
        self.check_signal(id, source)?;
        self.module_mut(id).assigns.push(Assign { target, source });
        Ok(())
    }

    /// Replaces a module's body kind.
    pub fn set_body(&mut self, id: ModuleId, body: ModuleBody) {
        self.module_mut(id).body = body;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverter(reg: &mut ModuleRegistry) -> ModuleId {
        let (inv, _) = reg.find_or_create_module("inv");
        reg.add_port(inv, "in", 1, ModulePortKind::Input).unwrap();
        reg.add_port(inv, "out", 1, ModulePortKind::Output).unwrap();
        reg.set_body(inv, ModuleBody::Leaf);
        inv
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let mut reg = ModuleRegistry::new();
        let (a, created) = reg.find_or_create_module("mux_size4");
        assert!(created);
        let (b, created) = reg.find_or_create_module("mux_size4");
        assert!(!created);
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.module_name(a), "mux_size4");
        assert_eq!(reg.find_module("other"), None);
    }

    #[test]
    fn rollback_forgets_newer_modules() {
        let mut reg = ModuleRegistry::new();
        let inv = inverter(&mut reg);
        let mark = reg.mark();
        let (top, _) = reg.find_or_create_module("top");
        reg.add_wire(top, "w", 1).unwrap();
        reg.find_or_create_module("buf");

        reg.rollback(mark);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.find_module("inv"), Some(inv));
        assert_eq!(reg.find_module("top"), None);
        assert_eq!(reg.find_module("buf"), None);
        let (again, created) = reg.find_or_create_module("top");
        assert!(created);
        assert!(reg.module(again).wires().is_empty());
    }

    #[test]
    fn instances_are_named_per_child() {
        let mut reg = ModuleRegistry::new();
        let inv = inverter(&mut reg);
        let (top, _) = reg.find_or_create_module("top");
        reg.add_wire(top, "w", 2).unwrap();
        for i in 0..2 {
            reg.add_instance(top, inv, vec![("in", vec![reg.bit("w", i)])])
                .unwrap();
        }

        let module = reg.module(top);
        assert_eq!(module.children(), &[(inv, 2)]);
        let names: Vec<_> = module.instances().iter().map(|i| reg.resolve(i.name)).collect();
        assert_eq!(names, vec!["inv_0_", "inv_1_"]);
        assert_eq!(
            module.instances()[1].binding(reg.intern("in")),
            Some(&[reg.bit("w", 1)][..])
        );
    }

    #[test]
    fn bindings_are_checked() {
        let mut reg = ModuleRegistry::new();
        let inv = inverter(&mut reg);
        let (top, _) = reg.find_or_create_module("top");
        reg.add_port(top, "a", 1, ModulePortKind::Input).unwrap();

        let err = reg
            .add_instance(top, inv, vec![("clk", vec![reg.bit("a", 0)])])
            .unwrap_err();
        assert!(matches!(err, MuxError::UnknownPort { .. }));

        let err = reg
            .add_instance(top, inv, vec![("in", reg.bus("a", 1).repeat(2))])
            .unwrap_err();
        assert!(matches!(err, MuxError::WidthMismatch { expected: 1, found: 2, .. }));

        let err = reg
            .add_instance(top, inv, vec![("in", vec![reg.bit("a", 3)])])
            .unwrap_err();
        assert!(matches!(err, MuxError::UnknownNet { index: 3, .. }));

        assert!(reg.module(top).instances().is_empty());
        assert!(reg.module(top).children().is_empty());
    }

    #[test]
    fn duplicate_nets_are_refused() {
        let mut reg = ModuleRegistry::new();
        let (top, _) = reg.find_or_create_module("top");
        reg.add_port(top, "in", 4, ModulePortKind::Input).unwrap();
        assert!(matches!(
            reg.add_wire(top, "in", 1),
            Err(MuxError::DuplicateNet { .. })
        ));
    }

    #[test]
    fn assigns_accept_constants_as_sources() {
        let mut reg = ModuleRegistry::new();
        let (top, _) = reg.find_or_create_module("top");
        reg.add_wire(top, "w", 1).unwrap();
        reg.add_assign(top, reg.bit("w", 0), Signal::Const(true)).unwrap();
        assert!(reg
            .add_assign(top, Signal::Const(false), reg.bit("w", 0))
            .is_err());
        assert_eq!(reg.module(top).assigns().len(), 1);
    }
}
