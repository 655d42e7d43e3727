use crate::analysis::pta::ci::CiSolver;
use crate::analysis::pta::context::{ContextInsensitiveSelector, KCallSelector, KObjSelector};
use crate::analysis::pta::cs::CsSolver;
use crate::builder::ProgramBuilder;
use crate::method::{MethodId, VarId};
use crate::program::Program;
use crate::types::Type;

/// main calls an identity function with two different allocations. The
/// returned objects cross-pollinate without contexts and stay separate with
/// one call site of sensitivity.
fn identity_program() -> (Program, IdentityVars) {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let a = b.class_extends("A", object);
    let bcls = b.class_extends("B", object);
    let sig_id = b.subsig("id", vec![Type::Reference(object)], Type::Reference(object));
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut id = b.static_method(object, sig_id);
    let o = id.param("o", Type::Reference(object));
    id.ret_var(o);
    let id = id.finish();

    let mut m = b.static_method(object, sig_main);
    let a1 = m.var("a1", Type::Reference(a));
    let b1 = m.var("b1", Type::Reference(bcls));
    let r1 = m.var("r1", Type::Reference(object));
    let r2 = m.var("r2", Type::Reference(object));
    m.new_object(a1, a); // 0
    m.invoke_static(object, sig_id, vec![a1], Some(r1)); // 1
    m.new_object(b1, bcls); // 2
    m.invoke_static(object, sig_id, vec![b1], Some(r2)); // 3
    m.ret(); // 4
    let main = m.finish();
    b.set_entry(main);
    (b.finish(), IdentityVars { id, o, a1, b1, r1, r2 })
}

struct IdentityVars {
    id: MethodId,
    o: VarId,
    a1: VarId,
    b1: VarId,
    r1: VarId,
    r2: VarId,
}

#[test]
fn context_insensitive_results_cross_pollinate() {
    let (program, v) = identity_program();
    let result = CiSolver::new(&program).solve().unwrap();
    // both returns see both allocations
    assert_eq!(result.var_pts(v.r1).len(), 2);
    assert_eq!(result.var_pts(v.r1), result.var_pts(v.r2));
}

#[test]
fn one_call_site_contexts_keep_the_returns_apart() {
    let (program, v) = identity_program();
    let result = CsSolver::new(&program, KCallSelector::new(1)).solve().unwrap();

    // two contexts of id exist
    let ir = program.ir(v.id).unwrap();
    assert_eq!(ir.params[0], v.o);
    let contexts = result.contexts_of_var(v.o);
    assert_eq!(contexts.len(), 2);

    // under each context the parameter holds exactly its own argument
    for ctx in contexts {
        assert_eq!(result.var_pts(ctx, v.o).len(), 1);
    }

    // no cross-pollination between the two returns
    let objs_r1 = result.objects_of_var(v.r1);
    let objs_r2 = result.objects_of_var(v.r2);
    assert_eq!(objs_r1.len(), 1);
    assert_eq!(objs_r2.len(), 1);
    assert_ne!(objs_r1, objs_r2);
    assert_eq!(objs_r1, result.objects_of_var(v.a1));
    assert_eq!(objs_r2, result.objects_of_var(v.b1));
}

#[test]
fn degenerate_selector_matches_the_insensitive_solver() {
    let (program, v) = identity_program();
    let ci = CiSolver::new(&program).solve().unwrap();
    let cs = CsSolver::new(&program, ContextInsensitiveSelector).solve().unwrap();

    for var in [v.o, v.a1, v.b1, v.r1, v.r2] {
        let ci_objs: indexmap::IndexSet<_> = ci.var_pts(var).iter().collect();
        let cs_objs = cs.objects_of_var(var);
        assert_eq!(ci_objs, cs_objs, "mismatch for {}", var);
    }
    assert_eq!(
        ci.call_graph().num_reachable(),
        cs.call_graph().num_reachable()
    );
}

/// Two holders, two payloads: object sensitivity keys the setter by its
/// receiver allocation, so the payloads never meet.
fn holder_program() -> (Program, HolderVars) {
    let mut b = ProgramBuilder::new();
    let object = b.class("Object");
    let holder = b.class_extends("Holder", object);
    let a = b.class_extends("A", object);
    let bcls = b.class_extends("B", object);
    let val = b.field(holder, "val", Type::Reference(object), false);
    let sig_set = b.subsig("set", vec![Type::Reference(object)], Type::Void);
    let sig_get = b.subsig("get", vec![], Type::Reference(object));
    let sig_main = b.subsig("main", vec![], Type::Void);

    let mut set = b.method(holder, sig_set);
    let sv = set.param("v", Type::Reference(object));
    let sthis = set.this().unwrap();
    set.store_field(sthis, val, sv);
    set.ret();
    set.finish();

    let mut get = b.method(holder, sig_get);
    let gthis = get.this().unwrap();
    let gr = get.var("r", Type::Reference(object));
    get.load_field(gr, gthis, val);
    get.ret_var(gr);
    get.finish();

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
    m.invoke_virtual(holder, sig_set, h1, vec![oa], None);
    m.invoke_virtual(holder, sig_set, h2, vec![ob], None);
    m.invoke_virtual(holder, sig_get, h1, vec![], Some(x));
    m.invoke_virtual(holder, sig_get, h2, vec![], Some(y));
    m.ret();
    let main = m.finish();
    b.set_entry(main);
    (b.finish(), HolderVars { oa, ob, x, y })
}

struct HolderVars {
    oa: VarId,
    ob: VarId,
    x: VarId,
    y: VarId,
}

#[test]
fn shared_setter_pollutes_without_contexts() {
    let (program, v) = holder_program();
    let result = CiSolver::new(&program).solve().unwrap();
    // the shared formal parameter of set() merges both payloads
    assert_eq!(result.var_pts(v.x).len(), 2);
    assert_eq!(result.var_pts(v.x), result.var_pts(v.y));
}

#[test]
fn object_sensitivity_separates_the_holders() {
    let (program, v) = holder_program();
    let result = CsSolver::new(&program, KObjSelector::new(1)).solve().unwrap();

    let objs_x = result.objects_of_var(v.x);
    let objs_y = result.objects_of_var(v.y);
    assert_eq!(objs_x.len(), 1, "x sees exactly its own payload: {:?}", objs_x);
    assert_eq!(objs_y.len(), 1, "y sees exactly its own payload: {:?}", objs_y);
    assert_ne!(objs_x, objs_y);
    assert_eq!(objs_x, result.objects_of_var(v.oa));
    assert_eq!(objs_y, result.objects_of_var(v.ob));
}

#[test]
fn call_site_sensitivity_also_separates_the_holders() {
    let (program, v) = holder_program();
    let result = CsSolver::new(&program, KCallSelector::new(1)).solve().unwrap();
    // 1-call-site: each set() call gets its own context, so the stores stay
    // keyed by distinct formals
    let objs_x = result.objects_of_var(v.x);
    let objs_y = result.objects_of_var(v.y);
    assert_eq!(objs_x.len(), 1);
    assert_eq!(objs_y.len(), 1);
    assert_ne!(objs_x, objs_y);
}

#[test]
fn cs_call_graph_is_closed_under_reachability() {
    let (program, _v) = holder_program();
    let result = CsSolver::new(&program, KObjSelector::new(1)).solve().unwrap();
    let cg = result.call_graph();
    for edge in cg.edges() {
        let caller = crate::analysis::pta::cs::CsMethod {
            ctx: edge.call_site.ctx,
            method: edge.call_site.site.method,
        };
        assert!(cg.is_reachable(caller));
        assert!(cg.is_reachable(edge.callee));
    }
}
