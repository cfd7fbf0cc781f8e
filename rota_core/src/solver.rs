//! The opaque optimization engine behind a narrow contract: take the model
//! graph, return a status and a variable assignment. The default backend
//! translates the graph to `good_lp` and solves with microlp.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use good_lp::variable::Variable;
use good_lp::{constraint, default_solver, variable, variables, Expression, ResolutionError, Solution, SolverModel};

use crate::error::ScheduleError;
use crate::model::{Direction, LinExpr, Model, Relation, VarKind, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    /// A satisfying but not proven-optimal assignment. The microlp backend
    /// never reports this; other engines may.
    Feasible,
}

/// A solved assignment for every variable of the model.
#[derive(Debug, Clone)]
pub struct Solved {
    pub status: SolveStatus,
    pub objective: f64,
    assignment: Vec<f64>,
}

impl Solved {
    pub fn value(&self, var: VarId) -> f64 {
        self.assignment[var.index()]
    }

    pub fn is_true(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }
}

/// Contract the pipeline consumes. The core never implements search or
/// propagation itself.
pub trait SolverBackend {
    fn solve(&self, model: Model, deadline: Option<Duration>) -> Result<Solved, ScheduleError>;
}

/// `good_lp` + microlp. Deterministic for identical input, so solving the
/// same request twice yields the same assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpBackend;

impl SolverBackend for MilpBackend {
    fn solve(&self, model: Model, deadline: Option<Duration>) -> Result<Solved, ScheduleError> {
        let Some(deadline) = deadline else {
            return solve_blocking(model);
        };

        // microlp has no cancellation hook, so the solve runs on a worker
        // thread and a missed deadline abandons it.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(solve_blocking(model));
        });
        match rx.recv_timeout(deadline) {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(?deadline, "solve abandoned after deadline");
                Err(ScheduleError::Timeout { deadline })
            }
        }
    }
}

fn solve_blocking(model: Model) -> Result<Solved, ScheduleError> {
    let mut builder = variables!();
    let mut handles: Vec<Variable> = Vec::with_capacity(model.var_count());
    for kind in model.vars() {
        let definition = match *kind {
            VarKind::Continuous { lb, ub } => variable().min(lb).max(ub),
            VarKind::Binary { fixed: None } => variable().binary(),
            VarKind::Binary { fixed: Some(value) } => {
                let value = if value { 1.0 } else { 0.0 };
                variable().integer().min(value).max(value)
            }
        };
        handles.push(builder.add(definition));
    }

    let (direction, objective) = match model.objective() {
        Some(o) => (o.direction, o.expr.clone()),
        None => (Direction::Minimize, LinExpr::new()),
    };
    let mut problem = match direction {
        Direction::Minimize => builder.minimise(to_expression(&objective, &handles)),
        Direction::Maximize => builder.maximise(to_expression(&objective, &handles)),
    }
    .using(default_solver);

    for c in model.constraints() {
        let lhs = to_expression(&c.expr, &handles);
        let built = match c.relation {
            Relation::Le => constraint::leq(lhs, c.rhs),
            Relation::Ge => constraint::geq(lhs, c.rhs),
            Relation::Eq => constraint::eq(lhs, c.rhs),
        };
        problem = problem.with(built);
    }

    match problem.solve() {
        Ok(solution) => {
            let assignment: Vec<f64> = handles.iter().map(|&h| solution.value(h)).collect();
            let objective = objective.eval(&assignment);
            Ok(Solved {
                status: SolveStatus::Optimal,
                objective,
                assignment,
            })
        }
        Err(ResolutionError::Infeasible) => Err(ScheduleError::Infeasible),
        Err(ResolutionError::Unbounded) => {
            Err(ScheduleError::Solver("objective is unbounded".into()))
        }
        Err(other) => Err(ScheduleError::Solver(other.to_string())),
    }
}

fn to_expression(expr: &LinExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(0);
    for &(var, coeff) in expr.terms() {
        out += coeff * handles[var.index()];
    }
    out
}
