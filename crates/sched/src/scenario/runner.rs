use std::collections::HashMap;

use tracing::debug;

use donor_core::ThreadId;

use crate::arena::QueueId;
use crate::error::SchedError;
use crate::queue::ThreadQueue;
use crate::scheduler::{Scheduler, Section};

use super::types::{Scenario, ScenarioReport, Step, StepRecord, ThreadSnapshot};

impl Scenario {
    /// Replay every step against a fresh scheduler.
    ///
    /// Stops at the first step that fails an expectation or would violate a
    /// scheduler contract.
    pub fn run(&self) -> Result<ScenarioReport, SchedError> {
        self.validate()?;
        let scheduler = Scheduler::with_config(self.scheduler.clone());
        let mut replay = Replay::new(self, scheduler.section());

        let mut steps = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let index = i + 1;
            debug!(step = index, %step, "scenario step");
            let (selected, applied) = replay.apply(index, step)?;
            steps.push(StepRecord {
                index,
                description: step.to_string(),
                selected: selected.map(|t| replay.name_of(t).to_string()),
                applied,
                threads: replay.snapshot(),
            });
        }

        Ok(ScenarioReport {
            name: self.name.clone(),
            steps,
            threads: replay.snapshot(),
            metrics: replay.section.metrics(),
        })
    }
}

struct Replay<'s, 'a> {
    scenario: &'s Scenario,
    section: Section<'a>,
    threads: HashMap<&'s str, ThreadId>,
    queues: HashMap<&'s str, QueueId>,
}

impl<'s, 'a> Replay<'s, 'a> {
    fn new(scenario: &'s Scenario, mut section: Section<'a>) -> Self {
        let mut threads = HashMap::new();
        for (i, spec) in scenario.threads.iter().enumerate() {
            let id = ThreadId(i as u64 + 1);
            if let Some(priority) = spec.priority {
                section.set_priority(id, priority);
            }
            threads.insert(spec.name.as_str(), id);
        }
        let queues = scenario
            .queues
            .iter()
            .map(|spec| (spec.name.as_str(), section.new_thread_queue(spec.transfer)))
            .collect();
        Self {
            scenario,
            section,
            threads,
            queues,
        }
    }

    fn thread(&self, name: &str) -> ThreadId {
        self.threads[name]
    }

    fn queue(&self, name: &str) -> QueueId {
        self.queues[name]
    }

    fn name_of(&self, thread: ThreadId) -> &'s str {
        let index = (thread.as_u64() - 1) as usize;
        &self.scenario.threads[index].name
    }

    fn queue_name_of(&self, queue: QueueId) -> &'s str {
        self.scenario
            .queues
            .iter()
            .find(|spec| self.queues[spec.name.as_str()] == queue)
            .map_or("?", |spec| spec.name.as_str())
    }

    fn snapshot(&self) -> Vec<ThreadSnapshot> {
        self.scenario
            .threads
            .iter()
            .map(|spec| {
                let id = self.thread(&spec.name);
                ThreadSnapshot {
                    name: spec.name.clone(),
                    base: self.section.priority(id),
                    effective: self.section.effective_priority(id),
                }
            })
            .collect()
    }

    /// Whether following donations from `from` reaches `target`.
    fn donates_to(&self, from: ThreadId, target: ThreadId) -> bool {
        let mut current = from;
        loop {
            if current == target {
                return true;
            }
            let Some(queue) = self.section.waiting_on(current) else {
                return false;
            };
            if !self.section.transfers_priority(queue) {
                return false;
            }
            match self.section.owner(queue) {
                Some(owner) => current = owner,
                None => return false,
            }
        }
    }

    fn apply(&mut self, index: usize, step: &Step) -> Result<(Option<ThreadId>, bool), SchedError> {
        let contract = |message: String| SchedError::Contract {
            step: index,
            message,
        };

        match step {
            Step::Wait { thread, queue } => {
                let (t, q) = (self.thread(thread), self.queue(queue));
                let owner = self.section.owner(q);
                if owner == Some(t) {
                    return Err(contract(format!("{thread} waits on {queue}, which it owns")));
                }
                if let Some(current) = self.section.waiting_on(t) {
                    let current = self.queue_name_of(current);
                    return Err(contract(format!("{thread} is already waiting on {current}")));
                }
                if let Some(owner) = owner.filter(|_| self.section.transfers_priority(q)) {
                    if self.donates_to(owner, t) {
                        return Err(contract(format!(
                            "{thread} waiting on {queue} would close an ownership cycle"
                        )));
                    }
                }
                self.section.queue(q).wait_for_access(t);
                Ok((None, true))
            }
            Step::Acquire { thread, queue } => {
                let (t, q) = (self.thread(thread), self.queue(queue));
                if let Some(owner) = self.section.owner(q) {
                    let owner = self.name_of(owner);
                    return Err(contract(format!("{queue} is already owned by {owner}")));
                }
                if self.section.waiting_on(t) == Some(q) {
                    return Err(contract(format!("{thread} is waiting on {queue}")));
                }
                if self.section.transfers_priority(q)
                    && self
                        .section
                        .waiters(q)
                        .into_iter()
                        .any(|w| self.donates_to(t, w))
                {
                    return Err(contract(format!(
                        "{thread} acquiring {queue} would close an ownership cycle"
                    )));
                }
                self.section.queue(q).acquire(t);
                Ok((None, true))
            }
            Step::Next { queue } => {
                let q = self.queue(queue);
                let selected = self.section.queue(q).next_thread();
                Ok((selected, true))
            }
            Step::ExpectNext { queue, thread } => {
                let q = self.queue(queue);
                let selected = self.section.queue(q).next_thread();
                let got = selected.map(|t| self.name_of(t));
                if got != thread.as_deref() {
                    return Err(SchedError::ExpectationFailed {
                        step: index,
                        message: format!(
                            "next on {queue} selected {}, expected {}",
                            got.unwrap_or("nobody"),
                            thread.as_deref().unwrap_or("nobody")
                        ),
                    });
                }
                Ok((selected, true))
            }
            Step::SetPriority { thread, priority } => {
                let t = self.thread(thread);
                self.section.set_priority(t, *priority);
                Ok((None, true))
            }
            Step::Increase { thread } => {
                let t = self.thread(thread);
                let applied = self.section.increase_priority(t);
                Ok((None, applied))
            }
            Step::Decrease { thread } => {
                let t = self.thread(thread);
                let applied = self.section.decrease_priority(t);
                Ok((None, applied))
            }
            Step::ExpectEffective { thread, priority } => {
                let actual = self.section.effective_priority(self.thread(thread));
                if actual != *priority {
                    return Err(SchedError::ExpectationFailed {
                        step: index,
                        message: format!(
                            "{thread} has effective priority {actual}, expected {priority}"
                        ),
                    });
                }
                Ok((None, true))
            }
        }
    }
}
