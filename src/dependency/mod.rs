//! This module contains the dependency graph builder, which follows the
//! execution of a path one instruction at a time and records which values
//! each value was computed from, and which memory each pointer may point to.
//!
//! # How it Works
//!
//! Every value that an instruction produces becomes a new [`ValueToken`] in
//! the [`ValueGraph`] shared by the whole exploration, with edges to the
//! tokens of its operands. Pointers carry the [`MemoryLocation`]s they may
//! point to, and the [`DependencyStore`] of each path maps those locations to
//! the tokens last written there. When a path later turns out to depend on
//! some value, marking that value as core walks these edges backwards so that
//! everything the value was computed from becomes part of the interpolant.

pub mod external;
pub mod graph;
pub mod location;
pub mod store;
pub mod token;

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use tracing::{debug, trace, warn};

pub use self::{
    graph::ValueGraph,
    location::{AllocationContext, LocationId, MemoryLocation},
    store::{DependencyStore, StoreEntry, StoreMap, StoredAddress, StoredValue},
    token::{TokenId, ValueToken},
};
use crate::{
    config::{Config, OffsetMismatchPolicy},
    constant::BOUNDS_CHECK_REASON,
    dependency::external::ExternalModel,
    error::{
        container::Locatable,
        dependency::{Error, Result},
    },
    expr::{Array, Expr, POINTER_WIDTH},
    ir::{CallStack, Callee, FunctionId, Instruction, InstructionKind, Value},
};

/// The dependency state of a single path.
///
/// The tokens themselves live in the [`ValueGraph`]; this only records which
/// token is the latest version of each value on the path, and what the path
/// has stored to memory. Cloning it at a split gives each child its own copy
/// of the parent's state.
#[derive(Clone, Debug)]
pub struct DependencyGraph {
    /// The latest token for each value, per call stack.
    values: HashMap<(Value, CallStack), TokenId>,

    /// What the path has written to memory.
    store: DependencyStore,

    /// The policy for inconsistent offset arithmetic.
    policy: OffsetMismatchPolicy,

    /// Set when the previous instruction aborted midway, so that its result
    /// may be missing.
    recovering: bool,
}

impl DependencyGraph {
    /// Creates the dependency state of an empty path.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            values:     HashMap::new(),
            store:      DependencyStore::new(),
            policy:     config.offset_mismatch,
            recovering: false,
        }
    }

    /// Creates the dependency state of a child path, which starts out as a copy
    /// of this one.
    #[must_use]
    pub fn fork(&self) -> Self {
        let mut child = self.clone();
        child.recovering = false;
        child
    }

    /// Gets what the path has written to memory.
    #[must_use]
    pub fn store(&self) -> &DependencyStore {
        &self.store
    }

    /// Gets the latest token for `value` under `call_stack`, if any.
    #[must_use]
    pub fn latest_value(&self, value: Value, call_stack: &CallStack) -> Option<TokenId> {
        self.values.get(&frame_key(value, call_stack)).copied()
    }

    /// Tells the graph that the previous instruction aborted midway, so the
    /// next instruction may find its operands missing.
    pub fn set_recovering(&mut self) {
        self.recovering = true;
    }

    /// Updates the dependency state for the execution of `instruction` with
    /// the given `operands` under `call_stack`.
    ///
    /// See [`InstructionKind`] for the expected operand expressions.
    ///
    /// # Errors
    ///
    /// If the operands do not match the instruction, or an operand has no
    /// recorded value.
    pub fn execute(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        operands: &[Expr],
        call_stack: &CallStack,
    ) -> Result<()> {
        trace!(
            instruction = %instruction.id,
            kind = instruction.kind.name(),
            "Updating dependencies"
        );
        let result = self
            .execute_kind(graph, instruction, operands, call_stack)
            .locate(instruction.id);
        self.recovering = false;
        result
    }

    /// Updates the dependency state for a phi node that was reached through
    /// its incoming edge `incoming`, producing `expression`.
    ///
    /// # Errors
    ///
    /// If `instruction` is not a phi node or has no such incoming edge, or the
    /// incoming value has no recorded value.
    pub fn execute_phi(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        incoming: usize,
        call_stack: &CallStack,
        expression: &Expr,
    ) -> Result<()> {
        let result = self
            .phi(graph, instruction, incoming, call_stack, expression)
            .locate(instruction.id);
        self.recovering = false;
        result
    }

    /// Updates the dependency state for a load or store of `value` at
    /// `address`.
    ///
    /// If the access was proven to be in bounds, the address becomes core: with
    /// `uses_bounds`, through a pointer flow that records the bounds it was
    /// checked against, and otherwise through a plain flow.
    ///
    /// # Errors
    ///
    /// If `instruction` is not a load or store, or if its operands cannot be
    /// resolved.
    #[allow(clippy::too_many_arguments)] // Necessary inputs, bundling them not beneficial
    pub fn execute_memory_operation(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        value: &Expr,
        address: &Expr,
        bounds_check_passed: bool,
        call_stack: &CallStack,
        uses_bounds: bool,
    ) -> Result<()> {
        let address_value = match &instruction.kind {
            InstructionKind::Load { address } | InstructionKind::Store { address, .. } => *address,
            kind => {
                return Err(Error::WrongEntryPoint { kind: kind.name() }.locate(instruction.id))
            }
        };
        self.execute(graph, instruction, &[value.clone(), address.clone()], call_stack)?;

        if !bounds_check_passed {
            return Ok(());
        }
        if let Some(token) = self.latest_value(address_value, call_stack) {
            if uses_bounds {
                graph
                    .mark_pointer_flow(token, token, &BTreeSet::new(), BOUNDS_CHECK_REASON, self.policy)
                    .locate(instruction.id)?;
            } else {
                graph.mark_flow(token, BOUNDS_CHECK_REASON);
            }
        }
        Ok(())
    }

    /// Binds the value returned by `ret` to the call instruction `call_site`
    /// in the caller's frame. `call_stack` is the stack of the returning
    /// function.
    ///
    /// # Errors
    ///
    /// If the returned value has no recorded value.
    pub fn bind_return_value(
        &mut self,
        graph: &mut ValueGraph,
        call_site: &Instruction,
        ret: &Instruction,
        expression: &Expr,
        call_stack: &CallStack,
    ) -> Result<()> {
        let InstructionKind::Return { value: Some(value) } = &ret.kind else {
            return Ok(());
        };
        self.return_value(graph, call_site, *value, expression, call_stack)
            .locate(ret.id)
    }

    /// Marks the latest token of `value` as core.
    pub fn mark_all_values(
        &self,
        graph: &mut ValueGraph,
        value: Value,
        call_stack: &CallStack,
        reason: &str,
    ) {
        if let Some(token) = self.latest_value(value, call_stack) {
            graph.mark_flow(token, reason);
        }
    }

    /// Gets the token of the branch condition `value`, which computes to
    /// `expression`, creating one if the value has no history of its own.
    ///
    /// # Errors
    ///
    /// If `value` is the result of an instruction that has no recorded value.
    pub fn condition_token(
        &mut self,
        graph: &mut ValueGraph,
        value: Value,
        expression: &Expr,
        call_stack: &CallStack,
    ) -> std::result::Result<TokenId, Error> {
        self.resolve(graph, value, expression, call_stack)
    }

    /// Takes a snapshot of the memory visible from `call_stack`. See
    /// [`DependencyStore::stored_expressions`].
    #[must_use]
    pub fn stored_expressions(
        &self,
        graph: &ValueGraph,
        call_stack: &CallStack,
        replacements: Option<&mut BTreeSet<Array>>,
        core_only: bool,
    ) -> (StoreMap, StoreMap) {
        self.store.stored_expressions(graph, call_stack, replacements, core_only)
    }

    /// Dispatches `instruction` to its handler, checking the operand count
    /// first.
    fn execute_kind(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        operands: &[Expr],
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let kind = &instruction.kind;
        if let Some(expected) = kind.expected_operands() {
            if operands.len() != expected {
                return Err(Error::OperandCount {
                    kind: kind.name(),
                    expected,
                    found: operands.len(),
                });
            }
        }

        match kind {
            InstructionKind::Alloca { size } => {
                let context = graph.intern_context(AllocationContext::new(instruction.value(), stack.clone()));
                let location = graph.insert_location(MemoryLocation::allocation(
                    context,
                    &operands[0],
                    size.unwrap_or(0),
                ));
                let token = graph.insert_token(
                    ValueToken::new(instruction.value(), operands[0].clone(), stack.clone())
                        .with_location(location),
                )?;
                self.bind(instruction.value(), stack, token);
            }
            InstructionKind::Load { address } => {
                self.load(graph, instruction, *address, &operands[0], &operands[1], stack)?;
            }
            InstructionKind::Store { value, address } => {
                self.store_value(graph, *value, *address, &operands[0], &operands[1], stack)?;
            }
            InstructionKind::GetElementPtr { base } => {
                let source = self.resolve(graph, *base, &operands[1], stack)?;
                let delta = Expr::sub(
                    Expr::zext(operands[0].clone(), POINTER_WIDTH),
                    Expr::zext(operands[1].clone(), POINTER_WIDTH),
                );
                self.derive(graph, instruction, source, &[], &operands[0], &delta, stack)?;
            }
            InstructionKind::Cast { operand, .. } => {
                let source = self.resolve(graph, *operand, &operands[1], stack)?;
                self.derive(graph, instruction, source, &[], &operands[0], &Expr::pointer(0), stack)?;
            }
            InstructionKind::Binary { op, lhs, rhs } => {
                let left = self.resolve(graph, *lhs, &operands[1], stack)?;
                let right = self.resolve(graph, *rhs, &operands[2], stack)?;
                let pointers = (graph.token(left).is_pointer(), graph.token(right).is_pointer());
                let (pointer, other, pointer_expr) = match pointers {
                    (true, false) if op.is_pointer_arithmetic() => (left, right, &operands[1]),
                    (false, true) if op.is_pointer_arithmetic() => (right, left, &operands[2]),
                    _ => {
                        let token = ValueToken::new(instruction.value(), operands[0].clone(), stack.clone())
                            .with_source(left, None)
                            .with_source(right, None);
                        let token = graph.insert_token(token)?;
                        self.bind(instruction.value(), stack, token);
                        return Ok(());
                    }
                };
                let delta = Expr::sub(
                    Expr::zext(operands[0].clone(), POINTER_WIDTH),
                    Expr::zext(pointer_expr.clone(), POINTER_WIDTH),
                );
                self.derive(graph, instruction, pointer, &[other], &operands[0], &delta, stack)?;
            }
            InstructionKind::Compare { lhs, rhs } => {
                let left = self.resolve(graph, *lhs, &operands[1], stack)?;
                let right = self.resolve(graph, *rhs, &operands[2], stack)?;
                for operand in [left, right] {
                    if graph.token(operand).is_pointer() {
                        graph.token_mut(operand).disable_bound_interpolation();
                    }
                }
                let token = graph.insert_token(
                    ValueToken::new(instruction.value(), operands[0].clone(), stack.clone())
                        .with_source(left, None)
                        .with_source(right, None),
                )?;
                self.bind(instruction.value(), stack, token);
            }
            InstructionKind::Select {
                condition,
                true_value,
                false_value,
            } => {
                let condition = self.resolve(graph, *condition, &operands[1], stack)?;
                let true_value = self.resolve(graph, *true_value, &operands[2], stack)?;
                let false_value = self.resolve(graph, *false_value, &operands[3], stack)?;
                let locations: BTreeSet<LocationId> = graph
                    .token(true_value)
                    .locations()
                    .union(graph.token(false_value).locations())
                    .copied()
                    .collect();
                let token = graph.insert_token(
                    ValueToken::new(instruction.value(), operands[0].clone(), stack.clone())
                        .with_source(condition, None)
                        .with_source(true_value, None)
                        .with_source(false_value, None)
                        .with_locations(locations),
                )?;
                self.bind(instruction.value(), stack, token);
            }
            InstructionKind::Phi { .. } => {
                return Err(Error::WrongEntryPoint { kind: kind.name() });
            }
            InstructionKind::Call {
                callee,
                arguments,
                returns_value,
            } => {
                let (result, argument_exprs) = if *returns_value {
                    (Some(&operands[0]), &operands[1..])
                } else {
                    (None, operands)
                };
                match callee {
                    Callee::Internal { function } => {
                        self.bind_call_arguments(graph, instruction, *function, arguments, argument_exprs, stack)?;
                    }
                    Callee::External { name } => {
                        self.call_external(graph, instruction, name, arguments, result, argument_exprs, stack)?;
                    }
                    Callee::Indirect => {
                        if let Some(result) = result {
                            debug!(instruction = %instruction.id, "Indirect call returns an unconstrained value");
                            self.fresh(graph, instruction, result, stack)?;
                        }
                    }
                }
            }
            InstructionKind::Return { .. } | InstructionKind::Branch { .. } | InstructionKind::Other => {}
        }

        Ok(())
    }

    fn return_value(
        &mut self,
        graph: &mut ValueGraph,
        call_site: &Instruction,
        value: Value,
        expression: &Expr,
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let source = self.resolve(graph, value, expression, stack)?;
        let caller = stack.pop();
        let locations = graph.token(source).locations().clone();
        let token = graph.insert_token(
            ValueToken::new(call_site.value(), expression.clone(), caller.clone())
                .with_source(source, None)
                .with_locations(locations),
        )?;
        self.bind(call_site.value(), &caller, token);
        Ok(())
    }

    fn phi(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        incoming: usize,
        stack: &CallStack,
        expression: &Expr,
    ) -> std::result::Result<(), Error> {
        let InstructionKind::Phi { incoming: values } = &instruction.kind else {
            return Err(Error::WrongEntryPoint {
                kind: instruction.kind.name(),
            });
        };
        let value = values.get(incoming).ok_or(Error::NoSuchIncoming {
            index:     incoming,
            available: values.len(),
        })?;

        let source = self.resolve(graph, *value, expression, stack)?;
        let locations = graph.token(source).locations().clone();
        let token = graph.insert_token(
            ValueToken::new(instruction.value(), expression.clone(), stack.clone())
                .with_source(source, None)
                .with_locations(locations),
        )?;
        self.bind(instruction.value(), stack, token);
        Ok(())
    }

    fn load(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        address_value: Value,
        loaded: &Expr,
        address_expr: &Expr,
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let address = self.resolve(graph, address_value, address_expr, stack)?;
        let address = self.ensure_pointer(graph, address_value, address, address_expr, stack)?;

        let mut token = ValueToken::new(instruction.value(), loaded.clone(), stack.clone())
            .with_load_address(address);
        let mut untouched = vec![];
        let locations: Vec<LocationId> = graph.token(address).locations().iter().copied().collect();
        for location in locations {
            match self.store.get(graph, location).copied() {
                Some(entry) => {
                    let stored = graph.token(entry.value);
                    token = token
                        .with_locations(stored.locations().iter().copied())
                        .with_source(entry.value, Some(location));
                }
                None => untouched.push(location),
            }
        }

        let token = graph.insert_token(token)?;
        for location in untouched {
            self.store.insert(graph, StoreEntry {
                location,
                address,
                value: token,
            });
        }
        self.bind(instruction.value(), stack, token);
        Ok(())
    }

    fn store_value(
        &mut self,
        graph: &mut ValueGraph,
        value: Value,
        address_value: Value,
        value_expr: &Expr,
        address_expr: &Expr,
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let source = self.resolve(graph, value, value_expr, stack)?;
        let address = self.resolve(graph, address_value, address_expr, stack)?;
        let address = self.ensure_pointer(graph, address_value, address, address_expr, stack)?;

        let source_locations = graph.token(source).locations().clone();
        let stored = graph.insert_token(
            ValueToken::new(value, value_expr.clone(), stack.clone())
                .with_locations(source_locations)
                .with_source(source, None)
                .with_store_address(address),
        )?;

        let locations: Vec<LocationId> = graph.token(address).locations().iter().copied().collect();
        for location in locations {
            self.store.insert(graph, StoreEntry {
                location,
                address,
                value: stored,
            });
        }
        Ok(())
    }

    fn bind_call_arguments(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        function: FunctionId,
        arguments: &[Value],
        argument_exprs: &[Expr],
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let callee_stack = stack.push(instruction.id);
        for (index, (argument, expr)) in arguments.iter().zip(argument_exprs).enumerate() {
            let source = self.resolve(graph, *argument, expr, stack)?;
            #[allow(clippy::cast_possible_truncation)]
            let formal = Value::Argument {
                function,
                index: index as u32,
            };
            let locations = graph.token(source).locations().clone();
            let token = graph.insert_token(
                ValueToken::new(formal, expr.clone(), callee_stack.clone())
                    .with_source(source, None)
                    .with_locations(locations),
            )?;
            self.bind(formal, &callee_stack, token);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)] // Necessary inputs, bundling them not beneficial
    fn call_external(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        name: &Arc<str>,
        arguments: &[Value],
        result: Option<&Expr>,
        argument_exprs: &[Expr],
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let model = external::model(name);
        if model.is_none() && graph.report_external(name) {
            warn!(function = %name, "Call to unmodeled external function; its result depends on nothing");
        }
        let Some(result) = result else {
            return Ok(());
        };

        match model {
            Some(ExternalModel::Allocation(size)) => {
                let sizes: Vec<Option<u64>> = argument_exprs.iter().map(Expr::constant_value).collect();
                self.allocation(graph, instruction, result, size.evaluate(&sizes), stack)?;
            }
            Some(ExternalModel::ForeignPointer) => {
                self.allocation(graph, instruction, result, 0, stack)?;
            }
            Some(ExternalModel::PointerInto(index)) => match (arguments.get(index), argument_exprs.get(index)) {
                (Some(argument), Some(expr)) => {
                    let source = self.resolve(graph, *argument, expr, stack)?;
                    let delta = Expr::sub(
                        Expr::zext(result.clone(), POINTER_WIDTH),
                        Expr::zext(expr.clone(), POINTER_WIDTH),
                    );
                    self.derive(graph, instruction, source, &[], result, &delta, stack)?;
                }
                _ => self.fresh(graph, instruction, result, stack)?,
            },
            Some(ExternalModel::DependsOn(indices)) => {
                let mut token = ValueToken::new(instruction.value(), result.clone(), stack.clone());
                for index in indices {
                    if let (Some(argument), Some(expr)) = (arguments.get(*index), argument_exprs.get(*index)) {
                        let source = self.resolve(graph, *argument, expr, stack)?;
                        token = token.with_source(source, None);
                    }
                }
                let token = graph.insert_token(token)?;
                self.bind(instruction.value(), stack, token);
            }
            Some(ExternalModel::Unconstrained) | None => {
                self.fresh(graph, instruction, result, stack)?;
            }
        }
        Ok(())
    }

    /// Creates the token of an allocating instruction that returns a pointer
    /// to `size` fresh bytes at `address`.
    fn allocation(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        address: &Expr,
        size: u64,
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let context = graph.intern_context(AllocationContext::new(instruction.value(), stack.clone()));
        let location = graph.insert_location(MemoryLocation::allocation(context, address, size));
        let token = graph.insert_token(
            ValueToken::new(instruction.value(), address.clone(), stack.clone()).with_location(location),
        )?;
        self.bind(instruction.value(), stack, token);
        Ok(())
    }

    /// Creates the token of `instruction` as a pointer derived from `source`
    /// by `delta` bytes, or as a plain dependent of `source` if it is not a
    /// pointer.
    #[allow(clippy::too_many_arguments)] // Necessary inputs, bundling them not beneficial
    fn derive(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        source: TokenId,
        others: &[TokenId],
        result: &Expr,
        delta: &Expr,
        stack: &CallStack,
    ) -> std::result::Result<TokenId, Error> {
        let mut token = ValueToken::new(instruction.value(), result.clone(), stack.clone())
            .with_source(source, None);
        for other in others {
            token = token.with_source(*other, None);
        }

        let locations: Vec<LocationId> = graph.token(source).locations().iter().copied().collect();
        for location in locations {
            let derived = graph.location(location).derive(result, delta, self.policy)?;
            token = token.with_location(graph.insert_location(derived));
        }

        let token = graph.insert_token(token)?;
        self.bind(instruction.value(), stack, token);
        Ok(token)
    }

    /// Creates a token for the result of `instruction` that depends on
    /// nothing.
    fn fresh(
        &mut self,
        graph: &mut ValueGraph,
        instruction: &Instruction,
        result: &Expr,
        stack: &CallStack,
    ) -> std::result::Result<(), Error> {
        let token = graph.insert_token(ValueToken::new(instruction.value(), result.clone(), stack.clone()))?;
        self.bind(instruction.value(), stack, token);
        Ok(())
    }

    /// Resolves `value`, used as an operand computing to `expr`, to its latest
    /// token, creating a token for values that have no history of their own.
    fn resolve(
        &mut self,
        graph: &mut ValueGraph,
        value: Value,
        expr: &Expr,
        stack: &CallStack,
    ) -> std::result::Result<TokenId, Error> {
        if let Some(token) = self.latest_value(value, stack) {
            return Ok(token);
        }

        match value {
            Value::Instruction(_) if !self.recovering => Err(Error::UnresolvedOperand { operand: value }),
            Value::Global(_) => {
                let context = graph.intern_context(AllocationContext::new(value, CallStack::new()));
                let location = graph.insert_location(MemoryLocation::allocation(context, expr, 0));
                let token = graph.insert_token(
                    ValueToken::new(value, expr.clone(), CallStack::new()).with_location(location),
                )?;
                self.bind(value, stack, token);
                Ok(token)
            }
            Value::Constant(_) => graph.insert_token(ValueToken::new(value, expr.clone(), stack.clone())),
            Value::Instruction(_) | Value::Argument { .. } => {
                if value.requires_history() {
                    debug!(%value, "Creating a fresh token for an operand lost to an aborted instruction");
                }
                let token = graph.insert_token(ValueToken::new(value, expr.clone(), stack.clone()))?;
                self.bind(value, stack, token);
                Ok(token)
            }
        }
    }

    /// Makes sure that `token`, used as an address computing to `expr`, points
    /// somewhere, synthesizing a location of unknown size for it otherwise.
    fn ensure_pointer(
        &mut self,
        graph: &mut ValueGraph,
        value: Value,
        token: TokenId,
        expr: &Expr,
        stack: &CallStack,
    ) -> std::result::Result<TokenId, Error> {
        if graph.token(token).is_pointer() {
            return Ok(token);
        }

        let (_, frame) = frame_key(value, stack);
        let context = graph.intern_context(AllocationContext::new(value, frame));
        let location = graph.insert_location(MemoryLocation::allocation(context, expr, 0));
        let pointer = graph.insert_token(
            ValueToken::new(value, expr.clone(), stack.clone())
                .with_location(location)
                .with_source(token, None),
        )?;
        if !matches!(value, Value::Constant(_)) {
            self.bind(value, stack, pointer);
        }
        Ok(pointer)
    }

    /// Records `token` as the latest version of `value`.
    fn bind(&mut self, value: Value, stack: &CallStack, token: TokenId) {
        self.values.insert(frame_key(value, stack), token);
    }
}

/// Gets the key under which the latest token of `value` is recorded. Globals
/// and constants are the same in every frame.
fn frame_key(value: Value, stack: &CallStack) -> (Value, CallStack) {
    match value {
        Value::Global(_) | Value::Constant(_) => (value, CallStack::new()),
        Value::Instruction(_) | Value::Argument { .. } => (value, stack.clone()),
    }
}
