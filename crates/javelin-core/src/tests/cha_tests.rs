use crate::analysis::callgraph::{dispatch, CallKind, ChaBuilder};
use crate::builder::ProgramBuilder;
use crate::program::Program;
use crate::types::Type;

/// A { f() }, abstract B extends A redeclaring f, C extends B { f() }.
/// A virtual call through B resolves to {C.f}: the abstract redeclaration
/// prunes A.f, the downward walk finds C.f.
#[test]
fn abstract_redeclaration_prunes_the_inherited_target() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let a = b.class_extends("A", object);
    let bb = b.class_extends("B", a);
    let c = b.class_extends("C", bb);
    let sig_f = b.subsig("f", vec![], Type::Void);
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut fa = b.method(a, sig_f);
    fa.ret();
    let fa = fa.finish();
    b.abstract_method(bb, sig_f);
    let mut fc = b.method(c, sig_f);
    fc.ret();
    let fc = fc.finish();

    let mut main = b.static_method(object, sig_main);
    let recv = main.var("b", Type::Reference(bb));
    main.new_object(recv, c);
    main.invoke_virtual(bb, sig_f, recv, vec![], None);
    main.ret();
    let main = main.finish();
    b.set_entry(main);
    let program = b.finish();

    let builder = ChaBuilder::new(&program);
    let ir = program.ir(main).unwrap();
    let invoke = ir.stmt(1).kind.as_invoke().unwrap();
    let targets = builder.resolve(invoke).unwrap();
    assert!(targets.contains(&fc));
    assert!(!targets.contains(&fa));
    assert_eq!(targets.len(), 1);

    // dispatch stops at the abstract redeclaration
    assert_eq!(dispatch(&program, bb, sig_f), None);
    assert_eq!(dispatch(&program, c, sig_f), Some(fc));
    assert_eq!(dispatch(&program, a, sig_f), Some(fa));
}

#[test]
fn virtual_resolution_collects_the_whole_subtree() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let base = b.class_extends("Base", object);
    let left = b.class_extends("Left", base);
    let right = b.class_extends("Right", base);
    let sig_f = b.subsig("f", vec![], Type::Void);
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut fb = b.method(base, sig_f);
    fb.ret();
    let fb = fb.finish();
    let mut fl = b.method(left, sig_f);
    fl.ret();
    let fl = fl.finish();
    // Right inherits Base.f

    let mut main = b.static_method(object, sig_main);
    let recv = main.var("r", Type::Reference(base));
    main.new_object(recv, right);
    main.invoke_virtual(base, sig_f, recv, vec![], None);
    main.ret();
    let main = main.finish();
    b.set_entry(main);
    let program = b.finish();

    let builder = ChaBuilder::new(&program);
    let invoke = program.ir(main).unwrap().stmt(1).kind.as_invoke().unwrap();
    let targets = builder.resolve(invoke).unwrap();
    // Base.f covers Base and Right; Left overrides
    assert_eq!(targets.len(), 2);
    assert!(targets.contains(&fb));
    assert!(targets.contains(&fl));
}

#[test]
fn interface_resolution_walks_subinterfaces_and_implementors() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let iface = b.interface("Runnable");
    let sub_iface = b.interface("Schedulable");
    b.implements(sub_iface, iface);
    let direct = b.class_extends("Direct", object);
    b.implements(direct, iface);
    let via_sub = b.class_extends("ViaSub", object);
    b.implements(via_sub, sub_iface);
    let child = b.class_extends("Child", direct);

    let sig_run = b.subsig("run", vec![], Type::Void);
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut m1 = b.method(direct, sig_run);
    m1.ret();
    let run_direct = m1.finish();
    let mut m2 = b.method(via_sub, sig_run);
    m2.ret();
    let run_via_sub = m2.finish();
    let mut m3 = b.method(child, sig_run);
    m3.ret();
    let run_child = m3.finish();

    let mut main = b.static_method(object, sig_main);
    let recv = main.var("r", Type::Reference(iface));
    main.new_object(recv, direct);
    main.invoke_interface(iface, sig_run, recv, vec![], None);
    main.ret();
    let main = main.finish();
    b.set_entry(main);
    let program = b.finish();

    let builder = ChaBuilder::new(&program);
    let invoke = program.ir(main).unwrap().stmt(1).kind.as_invoke().unwrap();
    let targets = builder.resolve(invoke).unwrap();
    assert_eq!(targets.len(), 3);
    assert!(targets.contains(&run_direct));
    assert!(targets.contains(&run_via_sub));
    assert!(targets.contains(&run_child));
}

fn diamond_program() -> (Program, crate::method::MethodId) {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let sig_main = b.subsig("main", vec![], Type::Void);
    let sig_helper = b.subsig("helper", vec![], Type::Void);
    let sig_leaf = b.subsig("leaf", vec![], Type::Void);

    let mut leaf = b.static_method(object, sig_leaf);
    leaf.ret();
    leaf.finish();

    let mut helper = b.static_method(object, sig_helper);
    helper.invoke_static(object, sig_leaf, vec![], None);
    helper.ret();
    helper.finish();

    let mut main = b.static_method(object, sig_main);
    main.invoke_static(object, sig_helper, vec![], None);
    main.invoke_static(object, sig_leaf, vec![], None);
    main.ret();
    let main = main.finish();
    b.set_entry(main);
    (b.finish(), main)
}

#[test]
fn call_graph_is_closed_under_reachability() {
    let (program, _main) = diamond_program();
    let call_graph = ChaBuilder::new(&program).build().unwrap();

    assert_eq!(call_graph.num_reachable(), 3);
    for edge in call_graph.edges() {
        assert!(call_graph.is_reachable(edge.call_site.method));
        assert!(call_graph.is_reachable(edge.callee));
        assert_eq!(edge.kind, CallKind::Static);
    }
}

#[test]
fn building_twice_yields_the_same_graph() {
    let (program, _main) = diamond_program();
    let first = ChaBuilder::new(&program).build().unwrap();
    let second = ChaBuilder::new(&program).build().unwrap();
    assert_eq!(first.num_reachable(), second.num_reachable());
    assert_eq!(first.num_edges(), second.num_edges());
    for edge in first.edges() {
        assert!(second.edges().any(|e| e == edge));
    }
}

#[test]
fn special_call_dispatches_through_the_superclass_chain() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let base = b.class_extends("Base", object);
    let derived = b.class_extends("Derived", base);
    let sig_init = b.subsig("init", vec![], Type::Void);
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut init = b.method(base, sig_init);
    init.ret();
    let init = init.finish();

    let mut main = b.static_method(object, sig_main);
    let recv = main.var("d", Type::Reference(derived));
    main.new_object(recv, derived);
    // Derived does not declare init; dispatch walks up to Base
    main.invoke_special(derived, sig_init, recv, vec![], None);
    main.ret();
    let main = main.finish();
    b.set_entry(main);
    let program = b.finish();

    let builder = ChaBuilder::new(&program);
    let invoke = program.ir(main).unwrap().stmt(1).kind.as_invoke().unwrap();
    let targets = builder.resolve(invoke).unwrap();
    assert_eq!(targets.len(), 1);
    assert!(targets.contains(&init));

    let call_graph = builder.build().unwrap();
    assert!(call_graph.is_reachable(init));
}
