// Generic step machine behind the interactive funnels. A wizard is an
// ordered list of step functions; each step receives the payload its
// predecessor produced and reports whether to move forward, step back, or
// cancel the whole run. The machine caches every step's last payload so
// stepping back replays exactly what the earlier step produced, without
// re-deriving anything.

use anyhow::{anyhow, bail, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Named parameters flowing from one step to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepData(Map<String, Value>);

impl StepData {
    pub fn new() -> Self {
        StepData(Map::new())
    }

    /// Builder-style insert; the value is serialized into the map.
    pub fn set(mut self, key: &str, value: impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        self.0.insert(key.to_string(), value);
        Ok(self)
    }

    /// Typed read of a named parameter. Missing keys and shape mismatches
    /// are wiring bugs between adjacent steps, reported with the key name.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| anyhow!("step input is missing `{key}`"))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow!("step input `{key}` has the wrong shape: {e}"))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a step decided. `Back` must never come out of the first step;
/// there is nothing before it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Store this payload and move to the next step.
    Forward(StepData),
    /// Re-enter the previous step with its old input.
    Back,
    /// User cancelled; end the whole run as a normal exit.
    Abort,
}

/// Where the machine goes next, decided by `transition` alone so the run
/// loop contains no index arithmetic of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Transition {
    Goto(usize),
    Finished,
    Cancelled,
}

fn transition(cursor: usize, step_count: usize, outcome: &Outcome) -> Result<Transition> {
    Ok(match outcome {
        Outcome::Forward(_) if cursor + 1 == step_count => Transition::Finished,
        Outcome::Forward(_) => Transition::Goto(cursor + 1),
        Outcome::Back => {
            if cursor == 0 {
                bail!("first step cannot go back");
            }
            Transition::Goto(cursor - 1)
        }
        Outcome::Abort => Transition::Cancelled,
    })
}

/// One step: reads the previous step's payload, talks to the context
/// (API client, prompter, presenter), and reports an `Outcome`.
pub type StepFn<C> = fn(&mut C, &StepData) -> Result<Outcome>;

/// Ordered steps plus the per-step payload cache for one run.
pub struct Wizard<C> {
    steps: Vec<StepFn<C>>,
    outputs: Vec<StepData>,
}

impl<C> Wizard<C> {
    pub fn new(steps: Vec<StepFn<C>>) -> Self {
        let outputs = vec![StepData::new(); steps.len()];
        Wizard { steps, outputs }
    }

    /// Drive the steps to completion. Returns `Ok(())` both when the last
    /// step moves forward and when the user aborts; cancellation is a
    /// normal way out, not a failure.
    pub fn run(&mut self, ctx: &mut C) -> Result<()> {
        let mut cursor = 0;
        let first_input = StepData::new();

        while cursor < self.steps.len() {
            let step = self.steps[cursor];
            let input = if cursor == 0 {
                &first_input
            } else {
                &self.outputs[cursor - 1]
            };

            let outcome = step(ctx, input)?;
            match transition(cursor, self.steps.len(), &outcome)? {
                Transition::Goto(next) => {
                    if let Outcome::Forward(data) = outcome {
                        self.outputs[cursor] = data;
                    }
                    cursor = next;
                }
                Transition::Finished => {
                    if let Outcome::Forward(data) = outcome {
                        self.outputs[cursor] = data;
                    }
                    return Ok(());
                }
                Transition::Cancelled => return Ok(()),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Per-run journal: which step ran, with which input.
    #[derive(Default)]
    struct Journal {
        calls: Vec<(usize, StepData)>,
        /// How many more times step 1 should answer `Back`.
        backs_left: usize,
    }

    fn record(ctx: &mut Journal, index: usize, input: &StepData) {
        ctx.calls.push((index, input.clone()));
    }

    fn step0(ctx: &mut Journal, input: &StepData) -> Result<Outcome> {
        record(ctx, 0, input);
        Ok(Outcome::Forward(StepData::new().set("from", "step0")?))
    }

    fn step1(ctx: &mut Journal, input: &StepData) -> Result<Outcome> {
        record(ctx, 1, input);
        Ok(Outcome::Forward(StepData::new().set("from", "step1")?))
    }

    fn step1_backs_then_forward(ctx: &mut Journal, input: &StepData) -> Result<Outcome> {
        record(ctx, 1, input);
        if ctx.backs_left > 0 {
            ctx.backs_left -= 1;
            return Ok(Outcome::Back);
        }
        Ok(Outcome::Forward(StepData::new().set("from", "step1")?))
    }

    fn step2(ctx: &mut Journal, input: &StepData) -> Result<Outcome> {
        record(ctx, 2, input);
        Ok(Outcome::Forward(StepData::new()))
    }

    fn step_aborts(ctx: &mut Journal, input: &StepData) -> Result<Outcome> {
        record(ctx, 9, input);
        Ok(Outcome::Abort)
    }

    fn step_backs(ctx: &mut Journal, input: &StepData) -> Result<Outcome> {
        record(ctx, 9, input);
        Ok(Outcome::Back)
    }

    #[test]
    fn straight_run_visits_every_step_once() {
        let steps: Vec<StepFn<Journal>> = vec![step0, step1, step2];
        let mut wizard = Wizard::new(steps);
        let mut journal = Journal::default();
        wizard.run(&mut journal).unwrap();

        let order: Vec<usize> = journal.calls.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn each_step_receives_its_predecessors_payload() {
        let steps: Vec<StepFn<Journal>> = vec![step0, step1, step2];
        let mut wizard = Wizard::new(steps);
        let mut journal = Journal::default();
        wizard.run(&mut journal).unwrap();

        assert!(journal.calls[0].1.is_empty());
        assert_eq!(journal.calls[1].1.get::<String>("from").unwrap(), "step0");
        assert_eq!(journal.calls[2].1.get::<String>("from").unwrap(), "step1");
    }

    #[test]
    fn back_bounces_between_adjacent_steps_without_skipping() {
        // Step 1 answers `Back` twice before moving forward: the machine
        // must re-run step 0 after each bounce and hand step 1 a fresh
        // step 0 payload every time.
        let steps: Vec<StepFn<Journal>> = vec![step0, step1_backs_then_forward, step2];
        let mut wizard = Wizard::new(steps);
        let mut journal = Journal {
            backs_left: 2,
            ..Journal::default()
        };
        wizard.run(&mut journal).unwrap();

        let order: Vec<usize> = journal.calls.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 0, 1, 0, 1, 2]);

        // Every step 1 invocation saw step 0's payload, including replays.
        for (index, input) in &journal.calls {
            if *index == 1 {
                assert_eq!(input.get::<String>("from").unwrap(), "step0");
            }
        }
    }

    #[test]
    fn back_replays_cached_output_two_steps_up() {
        // Step 2 backs out once; step 1 must then re-run with step 0's
        // cached payload, not with anything step 2 produced.
        fn step2_backs_once(ctx: &mut Journal, input: &StepData) -> Result<Outcome> {
            record(ctx, 2, input);
            if ctx.backs_left > 0 {
                ctx.backs_left -= 1;
                return Ok(Outcome::Back);
            }
            Ok(Outcome::Forward(StepData::new()))
        }

        let steps: Vec<StepFn<Journal>> = vec![step0, step1, step2_backs_once];
        let mut wizard = Wizard::new(steps);
        let mut journal = Journal {
            backs_left: 1,
            ..Journal::default()
        };
        wizard.run(&mut journal).unwrap();

        let order: Vec<usize> = journal.calls.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 1, 2, 1, 2]);
        // The replayed step 1 still sees step 0's output.
        assert_eq!(journal.calls[3].1.get::<String>("from").unwrap(), "step0");
    }

    #[test]
    fn abort_ends_the_run_cleanly() {
        let steps: Vec<StepFn<Journal>> = vec![step0, step_aborts, step2];
        let mut wizard = Wizard::new(steps);
        let mut journal = Journal::default();
        wizard.run(&mut journal).unwrap();

        let order: Vec<usize> = journal.calls.iter().map(|(i, _)| *i).collect();
        // Step 2 never ran.
        assert_eq!(order, vec![0, 9]);
    }

    #[test]
    fn back_from_first_step_is_an_error() {
        let steps: Vec<StepFn<Journal>> = vec![step_backs, step1];
        let mut wizard = Wizard::new(steps);
        let mut journal = Journal::default();
        assert!(wizard.run(&mut journal).is_err());
    }

    #[test]
    fn step_data_reports_missing_keys_by_name() {
        let data = StepData::new();
        let err = data.get::<String>("service").unwrap_err();
        assert!(err.to_string().contains("service"));
    }

    #[test]
    fn step_data_round_trips_structured_values() {
        let data = StepData::new()
            .set("ids", vec!["a", "b"])
            .unwrap()
            .set("count", 3)
            .unwrap();
        assert_eq!(
            data.get::<Vec<String>>("ids").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(data.get::<i64>("count").unwrap(), 3);
    }
}
