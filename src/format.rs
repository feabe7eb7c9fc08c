/*
 * Copyright 2019 Zejun Li
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::common::OptimizationMode;
use crate::pool::{PoolSolution, SolutionPool};
use crate::timer::Timer;

/// Objective-specific reporting hooks implemented by each family's solution.
pub trait ProgressDisplay {
    /// One human-readable progress row, e.g. `profit 230 waste 1200`.
    fn progress_line(&self) -> String;

    /// JSON summary written to the output document.
    fn to_json(&self) -> Value;
}

pub type NewSolutionCallback<S> = Box<dyn Fn(&S, f64) + Send + Sync>;

/// Knobs common to every family's `optimize`.
pub struct Parameters<S> {
    pub timer: Timer,
    /// 0 silences progress events.
    pub verbosity_level: u32,
    pub maximum_size_of_the_solution_pool: usize,
    pub optimization_mode: OptimizationMode,
    /// Invoked, under the formatter mutex, each time the pool's best
    /// strictly improves.
    pub new_solution_callback: Option<NewSolutionCallback<S>>,
}

impl<S> Default for Parameters<S> {
    fn default() -> Self {
        Parameters {
            timer: Timer::new(),
            verbosity_level: 1,
            maximum_size_of_the_solution_pool: 1,
            optimization_mode: OptimizationMode::Anytime,
            new_solution_callback: None,
        }
    }
}

/// Result of an `optimize` run.
pub struct Output<S: PoolSolution> {
    pub solution_pool: SolutionPool<S>,
    pub time: f64,
    pub number_of_nodes: u64,
    pub json: Value,
}

/// Serializes pool updates and reporting across workers.
///
/// The pool lives behind this mutex; `update_solution` is the only
/// synchronization point of a run.
pub struct AlgorithmFormatter<S: PoolSolution + ProgressDisplay> {
    timer: Timer,
    verbosity_level: u32,
    number_of_nodes: AtomicU64,
    state: Mutex<FormatterState<S>>,
}

struct FormatterState<S: PoolSolution> {
    pool: SolutionPool<S>,
    intermediary_outputs: Vec<Value>,
    callback: Option<NewSolutionCallback<S>>,
}

impl<S: PoolSolution + ProgressDisplay> AlgorithmFormatter<S> {
    pub fn new(parameters: &mut Parameters<S>, empty: S) -> Self {
        AlgorithmFormatter {
            timer: parameters.timer.clone(),
            verbosity_level: parameters.verbosity_level,
            number_of_nodes: AtomicU64::new(0),
            state: Mutex::new(FormatterState {
                pool: SolutionPool::new(parameters.maximum_size_of_the_solution_pool, empty),
                intermediary_outputs: Vec::new(),
                callback: parameters.new_solution_callback.take(),
            }),
        }
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn add_nodes(&self, count: u64) {
        self.number_of_nodes.fetch_add(count, Ordering::Relaxed);
    }

    /// Offer a solution to the pool. Progress row, JSON snapshot and user
    /// callback fire only on strict improvement of the best solution.
    pub fn update_solution(&self, solution: S, comment: &str) {
        let mut state = self.state.lock().unwrap();
        let time = self.timer.elapsed_time();
        if state.pool.add(solution) == 1 {
            if self.verbosity_level > 0 {
                tracing::info!(
                    time = format!("{:.3}", time).as_str(),
                    solution = state.pool.best().progress_line().as_str(),
                    comment,
                    "new solution",
                );
            }
            let snapshot = json!({
                "Solution": state.pool.best().to_json(),
                "Time": time,
            });
            state.intermediary_outputs.push(snapshot);
            if let Some(callback) = &state.callback {
                callback(state.pool.best(), time);
            }
        }
    }

    /// Read access to the current best, for optimality-certificate checks.
    pub fn with_best<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.lock().unwrap();
        f(state.pool.best())
    }

    /// Close the run and assemble the output document.
    pub fn into_output(self) -> Output<S> {
        let time = self.timer.elapsed_time();
        let number_of_nodes = self.number_of_nodes.into_inner();
        let state = self.state.into_inner().unwrap();
        let json = json!({
            "IntermediaryOutputs": state.intermediary_outputs,
            "Output": {
                "Solution": state.pool.best().to_json(),
                "Time": time,
                "NumberOfNodes": number_of_nodes,
            },
        });
        if self.verbosity_level > 0 {
            tracing::info!(
                time = format!("{:.3}", time).as_str(),
                number_of_nodes,
                solution = state.pool.best().progress_line().as_str(),
                "final statistics",
            );
        }
        Output {
            solution_pool: state.pool,
            time,
            number_of_nodes,
            json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ItemPos;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Clone)]
    struct FakeSolution {
        profit: i64,
        copies: Vec<ItemPos>,
    }

    impl PoolSolution for FakeSolution {
        fn strictly_better(&self, other: &Self) -> bool {
            self.profit > other.profit
        }

        fn item_copies(&self) -> &[ItemPos] {
            &self.copies
        }
    }

    impl ProgressDisplay for FakeSolution {
        fn progress_line(&self) -> String {
            format!("profit {}", self.profit)
        }

        fn to_json(&self) -> Value {
            json!({ "Profit": self.profit })
        }
    }

    #[test]
    fn callback_fires_only_on_strict_improvement() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_callback = calls.clone();
        let mut parameters: Parameters<FakeSolution> = Parameters {
            verbosity_level: 0,
            new_solution_callback: Some(Box::new(move |_, _| {
                calls_in_callback.fetch_add(1, Ordering::SeqCst);
            })),
            ..Parameters::default()
        };
        let empty = FakeSolution {
            profit: 0,
            copies: vec![0],
        };
        let formatter = AlgorithmFormatter::new(&mut parameters, empty);

        formatter.update_solution(
            FakeSolution {
                profit: 10,
                copies: vec![1],
            },
            "first",
        );
        formatter.update_solution(
            FakeSolution {
                profit: 5,
                copies: vec![2],
            },
            "not better",
        );
        formatter.update_solution(
            FakeSolution {
                profit: 20,
                copies: vec![3],
            },
            "second",
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let output = formatter.into_output();
        assert_eq!(output.solution_pool.best().profit, 20);
        assert_eq!(output.json["IntermediaryOutputs"].as_array().unwrap().len(), 2);
    }
}
