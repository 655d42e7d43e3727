/*! Fluent construction of analyzable programs.
 *
 * Frontends and tests assemble classes, methods and statement lists through
 * these builders; `finish` seals the program, deriving the hierarchy indexes
 * and per-variable usage tables every analysis reads.
 */

use crate::class::{Class, ClassId, Field, FieldId};
use crate::exp::{BinaryOp, Exp};
use crate::method::{Method, MethodId, MethodIr, SubsigId, Subsignature, VarId};
use crate::program::{Program, StmtSite, VarInfo, VarUsage};
use crate::stmt::{Invoke, InvokeKind, LValue, Stmt, StmtKind};
use crate::types::Type;
use indexmap::{IndexMap, IndexSet};

#[derive(Default)]
pub struct ProgramBuilder {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    vars: Vec<VarInfo>,
    subsigs: IndexSet<Subsignature>,
    entry: Option<MethodId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(&mut self, name: impl Into<String>) -> ClassId {
        self.add_class(name.into(), None, false)
    }

    pub fn class_extends(&mut self, name: impl Into<String>, super_class: ClassId) -> ClassId {
        self.add_class(name.into(), Some(super_class), false)
    }

    pub fn interface(&mut self, name: impl Into<String>) -> ClassId {
        self.add_class(name.into(), None, true)
    }

    fn add_class(&mut self, name: String, super_class: Option<ClassId>, is_interface: bool) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(Class {
            name,
            super_class,
            interfaces: Vec::new(),
            is_interface,
            methods: IndexMap::new(),
            fields: Vec::new(),
        });
        id
    }

    /// Declares that `class` implements (or, for interfaces, extends) `iface`.
    pub fn implements(&mut self, class: ClassId, iface: ClassId) {
        self.classes[class.0 as usize].interfaces.push(iface);
    }

    pub fn field(&mut self, class: ClassId, name: impl Into<String>, ty: Type, is_static: bool) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Field { class, name: name.into(), ty, is_static });
        self.classes[class.0 as usize].fields.push(id);
        id
    }

    pub fn subsig(&mut self, name: impl Into<String>, params: Vec<Type>, ret: Type) -> SubsigId {
        let (index, _) = self.subsigs.insert_full(Subsignature { name: name.into(), params, ret });
        SubsigId(index as u32)
    }

    pub fn abstract_method(&mut self, class: ClassId, subsig: SubsigId) -> MethodId {
        self.register_method(class, subsig, false, true)
    }

    pub fn method(&mut self, class: ClassId, subsig: SubsigId) -> MethodBuilder<'_> {
        let id = self.register_method(class, subsig, false, false);
        MethodBuilder::new(self, id, false)
    }

    pub fn static_method(&mut self, class: ClassId, subsig: SubsigId) -> MethodBuilder<'_> {
        let id = self.register_method(class, subsig, true, false);
        MethodBuilder::new(self, id, true)
    }

    fn register_method(&mut self, class: ClassId, subsig: SubsigId, is_static: bool, is_abstract: bool) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(Method { class, subsig, is_static, is_abstract, ir: None });
        self.classes[class.0 as usize].methods.insert(subsig, id);
        id
    }

    pub fn set_entry(&mut self, method: MethodId) {
        self.entry = Some(method);
    }

    pub fn finish(self) -> Program {
        let n = self.classes.len();
        let mut direct_subclasses = vec![Vec::new(); n];
        let mut direct_subinterfaces = vec![Vec::new(); n];
        let mut direct_implementors = vec![Vec::new(); n];
        for (i, class) in self.classes.iter().enumerate() {
            let id = ClassId(i as u32);
            if class.is_interface {
                for &iface in &class.interfaces {
                    direct_subinterfaces[iface.0 as usize].push(id);
                }
            } else {
                if let Some(super_class) = class.super_class {
                    direct_subclasses[super_class.0 as usize].push(id);
                }
                for &iface in &class.interfaces {
                    direct_implementors[iface.0 as usize].push(id);
                }
            }
        }

        let mut var_usage = vec![VarUsage::default(); self.vars.len()];
        for (m, method) in self.methods.iter().enumerate() {
            let Some(ir) = &method.ir else { continue };
            for stmt in &ir.stmts {
                let site = StmtSite { method: MethodId(m as u32), stmt: stmt.index };
                match &stmt.kind {
                    StmtKind::Assign { lhs, rhs } => {
                        match lhs {
                            LValue::InstanceField { base, .. } => {
                                var_usage[base.0 as usize].store_fields.push(site);
                            }
                            LValue::ArrayIndex { array } => {
                                var_usage[array.0 as usize].store_arrays.push(site);
                            }
                            LValue::Var(_) | LValue::StaticField(_) => {}
                        }
                        match rhs {
                            Exp::InstanceField { base, .. } => {
                                var_usage[base.0 as usize].load_fields.push(site);
                            }
                            Exp::ArrayAccess { array } => {
                                var_usage[array.0 as usize].load_arrays.push(site);
                            }
                            _ => {}
                        }
                    }
                    StmtKind::Invoke(invoke) => {
                        if let Some(recv) = invoke.receiver {
                            var_usage[recv.0 as usize].invokes.push(site);
                        }
                    }
                    _ => {}
                }
            }
        }

        Program {
            classes: self.classes,
            methods: self.methods,
            fields: self.fields,
            vars: self.vars,
            subsigs: self.subsigs,
            entry: self.entry,
            direct_subclasses,
            direct_subinterfaces,
            direct_implementors,
            var_usage,
        }
    }
}

/// Builds one method body. Statement indices are assigned in push order;
/// branch targets reference them directly, with `set_target` available for
/// forward jumps whose destination is not yet known.
pub struct MethodBuilder<'a> {
    builder: &'a mut ProgramBuilder,
    method: MethodId,
    params: Vec<VarId>,
    this: Option<VarId>,
    vars: Vec<VarId>,
    stmts: Vec<StmtKind>,
}

impl<'a> MethodBuilder<'a> {
    fn new(builder: &'a mut ProgramBuilder, method: MethodId, is_static: bool) -> Self {
        let mut mb = Self {
            builder,
            method,
            params: Vec::new(),
            this: None,
            vars: Vec::new(),
            stmts: Vec::new(),
        };
        if !is_static {
            let class = mb.builder.methods[method.0 as usize].class;
            let this = mb.fresh_var("this", Type::Reference(class));
            mb.this = Some(this);
        }
        mb
    }

    pub fn id(&self) -> MethodId {
        self.method
    }

    pub fn this(&self) -> Option<VarId> {
        self.this
    }

    pub fn param(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        let var = self.fresh_var(name, ty);
        self.params.push(var);
        var
    }

    pub fn var(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        self.fresh_var(name, ty)
    }

    fn fresh_var(&mut self, name: impl Into<String>, ty: Type) -> VarId {
        let id = VarId(self.builder.vars.len() as u32);
        self.builder.vars.push(VarInfo { name: name.into(), ty, method: self.method });
        self.vars.push(id);
        id
    }

    pub fn next_index(&self) -> usize {
        self.stmts.len()
    }

    pub fn push(&mut self, kind: StmtKind) -> usize {
        let index = self.stmts.len();
        self.stmts.push(kind);
        index
    }

    pub fn assign_int(&mut self, lhs: VarId, value: i32) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::IntLiteral(value) })
    }

    pub fn copy(&mut self, lhs: VarId, rhs: VarId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::Var(rhs) })
    }

    pub fn binary(&mut self, lhs: VarId, op: BinaryOp, a: VarId, b: VarId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::Binary { op, lhs: a, rhs: b } })
    }

    pub fn new_object(&mut self, lhs: VarId, class: ClassId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::New { class } })
    }

    pub fn new_array(&mut self, lhs: VarId, elem: Type) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::NewArray { elem } })
    }

    pub fn cast(&mut self, lhs: VarId, ty: Type, var: VarId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::Cast { ty, var } })
    }

    pub fn load_static(&mut self, lhs: VarId, field: FieldId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::StaticField(field) })
    }

    pub fn store_static(&mut self, field: FieldId, rhs: VarId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::StaticField(field), rhs: Exp::Var(rhs) })
    }

    pub fn load_field(&mut self, lhs: VarId, base: VarId, field: FieldId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::InstanceField { base, field } })
    }

    pub fn store_field(&mut self, base: VarId, field: FieldId, rhs: VarId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::InstanceField { base, field }, rhs: Exp::Var(rhs) })
    }

    pub fn load_array(&mut self, lhs: VarId, array: VarId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::Var(lhs), rhs: Exp::ArrayAccess { array } })
    }

    pub fn store_array(&mut self, array: VarId, rhs: VarId) -> usize {
        self.push(StmtKind::Assign { lhs: LValue::ArrayIndex { array }, rhs: Exp::Var(rhs) })
    }

    pub fn invoke_static(
        &mut self,
        class: ClassId,
        subsig: SubsigId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> usize {
        self.push(StmtKind::Invoke(Invoke {
            kind: InvokeKind::Static,
            declared_class: class,
            subsig,
            receiver: None,
            args,
            result,
        }))
    }

    pub fn invoke_virtual(
        &mut self,
        declared_class: ClassId,
        subsig: SubsigId,
        receiver: VarId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> usize {
        self.invoke_instance(InvokeKind::Virtual, declared_class, subsig, receiver, args, result)
    }

    pub fn invoke_interface(
        &mut self,
        declared_class: ClassId,
        subsig: SubsigId,
        receiver: VarId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> usize {
        self.invoke_instance(InvokeKind::Interface, declared_class, subsig, receiver, args, result)
    }

    pub fn invoke_special(
        &mut self,
        declared_class: ClassId,
        subsig: SubsigId,
        receiver: VarId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> usize {
        self.invoke_instance(InvokeKind::Special, declared_class, subsig, receiver, args, result)
    }

    fn invoke_instance(
        &mut self,
        kind: InvokeKind,
        declared_class: ClassId,
        subsig: SubsigId,
        receiver: VarId,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> usize {
        self.push(StmtKind::Invoke(Invoke {
            kind,
            declared_class,
            subsig,
            receiver: Some(receiver),
            args,
            result,
        }))
    }

    pub fn if_goto(&mut self, op: BinaryOp, a: VarId, b: VarId, target: usize) -> usize {
        self.push(StmtKind::If { cond: Exp::Binary { op, lhs: a, rhs: b }, target })
    }

    pub fn goto(&mut self, target: usize) -> usize {
        self.push(StmtKind::Goto { target })
    }

    pub fn switch(&mut self, selector: VarId, cases: Vec<(i32, usize)>, default: usize) -> usize {
        self.push(StmtKind::Switch { selector, cases, default })
    }

    pub fn ret(&mut self) -> usize {
        self.push(StmtKind::Return { value: None })
    }

    pub fn ret_var(&mut self, value: VarId) -> usize {
        self.push(StmtKind::Return { value: Some(value) })
    }

    pub fn nop(&mut self) -> usize {
        self.push(StmtKind::Nop)
    }

    /// Patches the branch target of an `If` or `Goto` pushed earlier.
    pub fn set_target(&mut self, stmt: usize, target: usize) {
        match &mut self.stmts[stmt] {
            StmtKind::If { target: t, .. } | StmtKind::Goto { target: t } => *t = target,
            other => panic!("statement {} has no branch target: {:?}", stmt, other),
        }
    }

    pub fn finish(self) -> MethodId {
        let mut return_vars = Vec::new();
        for kind in &self.stmts {
            if let StmtKind::Return { value: Some(v) } = kind {
                if !return_vars.contains(v) {
                    return_vars.push(*v);
                }
            }
        }
        let stmts = self
            .stmts
            .into_iter()
            .enumerate()
            .map(|(index, kind)| Stmt { index, kind })
            .collect();
        let ir = MethodIr {
            params: self.params,
            this: self.this,
            vars: self.vars,
            stmts,
            return_vars,
        };
        self.builder.methods[self.method.0 as usize].ir = Some(ir);
        self.method
    }
}
