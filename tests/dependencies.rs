//! This module is an integration test that checks the dependency tracking of
//! the interpolation tree on small, hand-constructed, paths.
#![cfg(test)]

use std::sync::Arc;

use common::{constant, instr, int, val, var};
use symbolic_interpolation::{
    expr::Expr,
    ir::{Callee, FunctionId, InstructionKind, Value},
    Config,
    InterpolationTree,
};

mod common;

#[test]
fn loads_see_the_value_stored_before() -> anyhow::Result<()> {
    let mut tree = InterpolationTree::new(Config::default());
    let root = tree.root();
    let alloca = instr(1, InstructionKind::Alloca { size: Some(8) });
    tree.set_current_node(root, &alloca)?;

    // Allocate, store 42 and load it back
    tree.execute(&alloca, &[Expr::pointer(0x2000)])?;
    let store = instr(2, InstructionKind::Store {
        value:   constant(0),
        address: val(1),
    });
    tree.execute(&store, &[int(42), Expr::pointer(0x2000)])?;
    let load = instr(3, InstructionKind::Load { address: val(1) });
    tree.execute(&load, &[var("unknown"), Expr::pointer(0x2000)])?;

    let node = tree.node(root).ok_or_else(|| anyhow::anyhow!("no root"))?;
    let pointer = node
        .dependencies()
        .latest_value(val(1), node.call_stack())
        .ok_or_else(|| anyhow::anyhow!("no pointer"))?;
    let location = tree
        .values()
        .token(pointer)
        .locations()
        .iter()
        .next()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("no location"))?;
    assert_eq!(tree.values().location(location).size(), 8);

    // The loaded value comes from the store, whatever the host says it is
    let loaded = node
        .dependencies()
        .latest_value(val(3), node.call_stack())
        .ok_or_else(|| anyhow::anyhow!("no load"))?;
    let (stored, _) = tree
        .values()
        .token(loaded)
        .sources()
        .iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no source"))?;
    assert_eq!(tree.values().token(*stored).expression().constant_value(), Some(42));
    assert_eq!(node.instructions_depth(), 3);

    Ok(())
}

#[test]
fn unmodeled_calls_do_not_link_their_arguments() -> anyhow::Result<()> {
    let mut tree = InterpolationTree::new(Config::default());
    let root = tree.root();
    let alloca = instr(1, InstructionKind::Alloca { size: Some(4) });
    tree.set_current_node(root, &alloca)?;
    tree.execute(&alloca, &[Expr::pointer(0x40)])?;

    let tokens = tree.values().token_count();
    let call = instr(2, InstructionKind::Call {
        callee:        Callee::External {
            name: Arc::from("mystery"),
        },
        arguments:     vec![val(1)],
        returns_value: false,
    });
    tree.execute(&call, &[Expr::pointer(0x40)])?;
    tree.execute(&call, &[Expr::pointer(0x40)])?;

    let node = tree.node(root).ok_or_else(|| anyhow::anyhow!("no root"))?;
    assert_eq!(tree.values().token_count(), tokens);
    assert!(node.dependencies().latest_value(val(2), node.call_stack()).is_none());
    assert!(node.dependencies().store().is_empty());

    Ok(())
}

#[test]
fn calls_enter_and_leave_frames() -> anyhow::Result<()> {
    let mut tree = InterpolationTree::new(Config::default());
    let root = tree.root();
    let alloca = instr(1, InstructionKind::Alloca { size: Some(4) });
    tree.set_current_node(root, &alloca)?;
    tree.execute(&alloca, &[Expr::pointer(0x40)])?;

    let call = instr(2, InstructionKind::Call {
        callee:        Callee::Internal {
            function: FunctionId::new(7),
        },
        arguments:     vec![val(1)],
        returns_value: true,
    });
    tree.execute(&call, &[var("result"), Expr::pointer(0x40)])?;
    let depth = tree.node(root).map(|n| n.call_stack().len());
    assert_eq!(depth, Some(1));

    let formal = Value::Argument {
        function: FunctionId::new(7),
        index:    0,
    };
    let ret = instr(3, InstructionKind::Return { value: Some(formal) });
    tree.execute(&ret, &[])?;
    tree.bind_return_value(&call, &ret, &Expr::pointer(0x40))?;

    let node = tree.node(root).ok_or_else(|| anyhow::anyhow!("no root"))?;
    assert!(node.call_stack().is_empty());
    let result = node
        .dependencies()
        .latest_value(val(2), node.call_stack())
        .ok_or_else(|| anyhow::anyhow!("no result"))?;
    assert!(tree.values().token(result).is_pointer());

    Ok(())
}

#[test]
fn aborted_instructions_are_recovered_from() -> anyhow::Result<()> {
    let mut tree = InterpolationTree::new(Config::default().with_tree_graph(true));
    let root = tree.root();
    let load = instr(5, InstructionKind::Load { address: val(4) });
    tree.set_current_node(root, &load)?;

    assert!(tree.execute(&load, &[var("v"), Expr::pointer(0x80)]).is_err());

    tree.set_symbolic_execution_error(&load)?;
    tree.execute(&load, &[var("v"), Expr::pointer(0x80)])?;
    let dot = tree.render_graph().unwrap_or_default();
    assert!(dot.contains("OUT-OF-BOUND: %5"));

    Ok(())
}
