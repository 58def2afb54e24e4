//! This module is an integration test that allows manual poking of the state of
//! the interpolation tree at any point of a small exploration.
#![cfg(test)]

use common::{argument, constant, instr, int, var, ScriptedSolver};
use symbolic_interpolation::{expr::Expr, ir::InstructionKind, Config, InterpolationTree};

mod common;

#[test]
fn inspect_exploration() -> anyhow::Result<()> {
    // Set to true if you are debugging
    let should_print = false;

    let mut tree = InterpolationTree::new(Config::default().with_tree_graph(true));
    let mut solver = ScriptedSolver::unknowing();

    // Branch on `x < 10` at the root
    let root = tree.root();
    let compare = instr(1, InstructionKind::Compare {
        lhs: argument(0),
        rhs: constant(0),
    });
    let below = Expr::ult(var("x"), int(10));
    tree.set_current_node(root, &compare)?;
    tree.execute(&compare, &[below.clone(), var("x"), int(10)])?;
    let (left, right) = tree.split(root)?;

    // Both sides join at the same instruction
    let join = instr(2, InstructionKind::Other);
    tree.set_current_node(left, &join)?;
    tree.add_constraint(Expr::negate(below.clone()), compare.value())?;
    assert!(!tree.subsumption_check(&mut solver, None)?);
    tree.remove(left)?;

    tree.set_current_node(right, &join)?;
    tree.add_constraint(below, compare.value())?;
    assert!(tree.subsumption_check(&mut solver, None)?);
    tree.remove(right)?;

    if should_print {
        println!("{tree}");
        println!("{}", tree.statistics());
        println!("{}", tree.render_graph().unwrap_or_default());
    }

    assert_eq!(tree.live_nodes(), 0);
    assert_eq!(tree.statistics().subsumption_successes, 1);

    Ok(())
}
