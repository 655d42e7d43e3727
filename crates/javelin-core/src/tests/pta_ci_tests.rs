use crate::analysis::callgraph::CallKind;
use crate::analysis::pta::ci::CiSolver;
use crate::builder::ProgramBuilder;
use crate::types::Type;

#[test]
fn copies_share_one_allocation() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let t = b.class_extends("T", object);
    let sig_main = b.subsig("main", vec![], Type::Void);
    let mut m = b.static_method(object, sig_main);
    let x = m.var("x", Type::Reference(t));
    let y = m.var("y", Type::Reference(t));
    let z = m.var("z", Type::Reference(t));
    m.new_object(x, t);
    m.copy(y, x);
    m.copy(z, y);
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let result = CiSolver::new(&program).solve().unwrap();
    let px = result.var_pts(x);
    let py = result.var_pts(y);
    let pz = result.var_pts(z);
    assert_eq!(px.len(), 1);
    assert_eq!(px, py);
    assert_eq!(py, pz);
    // only main is reachable
    assert_eq!(result.call_graph().num_reachable(), 1);
}

#[test]
fn instance_fields_are_keyed_by_receiver_object() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let holder = b.class_extends("Holder", object);
    let a = b.class_extends("A", object);
    let bcls = b.class_extends("B", object);
    let val = b.field(holder, "val", Type::Reference(object), false);
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut m = b.static_method(object, sig_main);
    let h1 = m.var("h1", Type::Reference(holder));
    let h2 = m.var("h2", Type::Reference(holder));
    let oa = m.var("oa", Type::Reference(a));
    let ob = m.var("ob", Type::Reference(bcls));
    let x = m.var("x", Type::Reference(object));
    let y = m.var("y", Type::Reference(object));
    m.new_object(h1, holder);
    m.new_object(h2, holder);
    m.new_object(oa, a);
    m.new_object(ob, bcls);
    m.store_field(h1, val, oa);
    m.store_field(h2, val, ob);
    m.load_field(x, h1, val);
    m.load_field(y, h2, val);
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let result = CiSolver::new(&program).solve().unwrap();
    let px = result.var_pts(x);
    let py = result.var_pts(y);
    // distinct receiver objects keep their fields apart
    assert_eq!(px.len(), 1);
    assert_eq!(py.len(), 1);
    assert_ne!(px, py);
}

#[test]
fn array_elements_flow_through_the_index_pointer() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let a = b.class_extends("A", object);
    let sig_main = b.subsig("main", vec![], Type::Void);
    let elem_ty = Type::Reference(object);

    let mut m = b.static_method(object, sig_main);
    let arr = m.var("arr", Type::Array(Box::new(elem_ty.clone())));
    let x = m.var("x", Type::Reference(a));
    let y = m.var("y", Type::Reference(object));
    m.new_array(arr, elem_ty);
    m.new_object(x, a);
    m.store_array(arr, x);
    m.load_array(y, arr);
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let result = CiSolver::new(&program).solve().unwrap();
    let py = result.var_pts(y);
    assert_eq!(py.len(), 1);
    assert_eq!(py, result.var_pts(x));
}

#[test]
fn static_fields_bridge_methods() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let a = b.class_extends("A", object);
    let shared = b.field(object, "shared", Type::Reference(object), true);
    let sig_main = b.subsig("main", vec![], Type::Void);
    let sig_read = b.subsig("read", vec![], Type::Void);

    let mut read = b.static_method(object, sig_read);
    let y = read.var("y", Type::Reference(object));
    read.load_static(y, shared);
    read.ret();
    read.finish();

    let mut m = b.static_method(object, sig_main);
    let x = m.var("x", Type::Reference(a));
    m.new_object(x, a);
    m.store_static(shared, x);
    m.invoke_static(object, sig_read, vec![], None);
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let result = CiSolver::new(&program).solve().unwrap();
    assert_eq!(result.var_pts(y).len(), 1);
    assert_eq!(result.var_pts(y), result.var_pts(x));
    assert_eq!(result.call_graph().num_reachable(), 2);
}

/// Virtual dispatch against the concrete receiver type: a Base-typed variable
/// holding a Derived object calls Derived.get, and the receiver, argument and
/// return flows all materialize.
#[test]
fn on_the_fly_dispatch_uses_the_concrete_type() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let base = b.class_extends("Base", object);
    let derived = b.class_extends("Derived", base);
    let payload = b.class_extends("Payload", object);
    let sig_get = b.subsig("get", vec![Type::Reference(object)], Type::Reference(object));
    let sig_main = b.subsig("main", vec![], Type::Void);

    // Base.get returns null-ish: no allocation, returns its own argument
    let mut base_get = b.method(base, sig_get);
    let bp = base_get.param("p", Type::Reference(object));
    base_get.ret_var(bp);
    let base_get = base_get.finish();

    let mut derived_get = b.method(derived, sig_get);
    let dp = derived_get.param("p", Type::Reference(object));
    derived_get.ret_var(dp);
    let derived_get = derived_get.finish();

    let mut m = b.static_method(object, sig_main);
    let recv = m.var("recv", Type::Reference(base));
    let arg = m.var("arg", Type::Reference(payload));
    let out = m.var("out", Type::Reference(object));
    m.new_object(recv, derived);
    m.new_object(arg, payload);
    m.invoke_virtual(base, sig_get, recv, vec![arg], Some(out));
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let result = CiSolver::new(&program).solve().unwrap();

    // only the concrete target became reachable
    let derived_ir = program.ir(derived_get).unwrap();
    assert!(result.call_graph().is_reachable(derived_get));
    assert!(!result.call_graph().is_reachable(base_get));

    // receiver flowed into this, argument into the formal, return into out
    let this = derived_ir.this.unwrap();
    assert_eq!(result.var_pts(this), result.var_pts(recv));
    assert_eq!(result.var_pts(dp), result.var_pts(arg));
    assert_eq!(result.var_pts(out), result.var_pts(arg));

    let edge = result.call_graph().edges().next().unwrap();
    assert_eq!(edge.kind, CallKind::Virtual);
}

#[test]
fn callees_discovered_late_still_process_their_bodies() {
    // The receiver object only reaches the call site after flowing through a
    // copy chain; the callee's own allocation must still be picked up.
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let maker = b.class_extends("Maker", object);
    let thing = b.class_extends("Thing", object);
    let sig_make = b.subsig("make", vec![], Type::Reference(thing));
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut make = b.method(maker, sig_make);
    let t = make.var("t", Type::Reference(thing));
    make.new_object(t, thing);
    make.ret_var(t);
    let make = make.finish();

    let mut m = b.static_method(object, sig_main);
    let a = m.var("a", Type::Reference(maker));
    let bvar = m.var("b", Type::Reference(maker));
    let r = m.var("r", Type::Reference(thing));
    m.new_object(a, maker);
    m.copy(bvar, a);
    m.invoke_virtual(maker, sig_make, bvar, vec![], Some(r));
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let result = CiSolver::new(&program).solve().unwrap();
    assert!(result.call_graph().is_reachable(make));
    assert_eq!(result.var_pts(r).len(), 1);
    assert_eq!(result.var_pts(r), result.var_pts(t));
}

#[test]
fn solving_twice_is_deterministic() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let t = b.class_extends("T", object);
    let sig_main = b.subsig("main", vec![], Type::Void);
    let mut m = b.static_method(object, sig_main);
    let x = m.var("x", Type::Reference(t));
    let y = m.var("y", Type::Reference(t));
    m.new_object(x, t);
    m.new_object(y, t);
    m.copy(y, x);
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let first = CiSolver::new(&program).solve().unwrap();
    let second = CiSolver::new(&program).solve().unwrap();
    assert_eq!(first.var_pts(x), second.var_pts(x));
    assert_eq!(first.var_pts(y), second.var_pts(y));
    assert_eq!(first.pfg().num_pointers(), second.pfg().num_pointers());
    assert_eq!(first.call_graph().num_edges(), second.call_graph().num_edges());
}

/// Points-to sets only ever grow while the worklist drains; the final sets
/// contain every object seeded for their pointer.
#[test]
fn points_to_sets_grow_monotonically() {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let t = b.class_extends("T", object);
    let u = b.class_extends("U", object);
    let sig_main = b.subsig("main", vec![], Type::Void);
    let mut m = b.static_method(object, sig_main);
    let x = m.var("x", Type::Reference(object));
    let y = m.var("y", Type::Reference(object));
    m.new_object(x, t);
    m.new_object(x, u);
    m.copy(y, x);
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    let program = b.finish();

    let result = CiSolver::new(&program).solve().unwrap();
    assert_eq!(result.var_pts(x).len(), 2);
    assert_eq!(result.var_pts(y).len(), 2);
}
