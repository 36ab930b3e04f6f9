//! Minimal discrete-event engine.
//!
//! Agents receive every event broadcast by the [`EventLoop`], react by
//! returning a [`Response`] holding follow-up events (and optionally new
//! agents), and expose their observable state through [`Agent::stats`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

pub mod parallel;

struct Event<T> {
    t: usize,
    seq: usize,
    data: T,
}

impl<T> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.t == other.t && self.seq == other.seq
    }
}

impl<T> Eq for Event<T> {}

impl<T> Ord for Event<T> {
    // Min-heap on time, FIFO among events scheduled for the same time.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .t
            .cmp(&self.t)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What an agent hands back to the loop after acting on an event.
pub struct Response<T, S> {
    pub events: Vec<(usize, T)>,
    pub agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> Response<T, S> {
    pub fn new() -> Response<T, S> {
        Response {
            events: Vec::new(),
            agents: Vec::new(),
        }
    }

    /// Schedule a single follow-up event at time `t`.
    pub fn event(t: usize, data: T) -> Response<T, S> {
        Response {
            events: vec![(t, data)],
            agents: Vec::new(),
        }
    }

    pub fn events(events: Vec<(usize, T)>) -> Response<T, S> {
        Response {
            events,
            agents: Vec::new(),
        }
    }
}

impl<T, S> Default for Response<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Agent<T, S> {
    fn act(&mut self, _current_t: usize, _data: &T) -> Response<T, S> {
        Response::new()
    }

    fn stats(&self) -> S;
}

pub struct EventLoop<T, S> {
    queue: BinaryHeap<Event<T>>,
    current_t: usize,
    next_seq: usize,
    agents: Vec<Box<dyn Agent<T, S>>>,
}

impl<T, S> EventLoop<T, S> {
    pub fn new(events: Vec<(usize, T)>, agents: Vec<Box<dyn Agent<T, S>>>) -> EventLoop<T, S> {
        let mut event_loop = EventLoop {
            queue: BinaryHeap::new(),
            current_t: 0,
            next_seq: 0,
            agents,
        };
        for (t, data) in events {
            event_loop.schedule(t, data);
        }
        event_loop
    }

    fn schedule(&mut self, t: usize, data: T) {
        self.queue.push(Event {
            t,
            seq: self.next_seq,
            data,
        });
        self.next_seq += 1;
    }

    fn broadcast(&mut self) {
        if let Some(event) = self.queue.pop() {
            self.current_t = event.t;
            let mut new_events = Vec::new();
            let mut new_agents = Vec::new();
            for agent in &mut self.agents {
                let response = agent.act(self.current_t, &event.data);
                // Events in the past are dropped.
                new_events.extend(
                    response
                        .events
                        .into_iter()
                        .filter(|(t, _)| *t >= event.t),
                );
                new_agents.extend(response.agents);
            }
            for (t, data) in new_events {
                self.schedule(t, data);
            }
            self.agents.extend(new_agents);
        }
    }

    /// Process events until the queue drains or the next event lies after `run_until`.
    pub fn run(&mut self, run_until: usize) {
        while let Some(event) = self.queue.peek() {
            if event.t > run_until {
                break;
            }
            self.broadcast();
        }
    }

    pub fn current_t(&self) -> usize {
        self.current_t
    }

    pub fn stats(&self) -> Vec<S> {
        self.agents.iter().map(|agent| agent.stats()).collect()
    }
}
