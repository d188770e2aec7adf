// Copyright (c) 2024 Mike Tsao

//! [ReplayHardwareService] stands in for pulse-replay hardware. It drains a
//! [ReplayQueue] on its own thread at the configured tick rate, one pulse word
//! per tick, and reports what it saw over a crossbeam channel.

use amwave::{
    orchestration::ReplayQueue,
    traits::ProvidesService,
    types::{CrossbeamChannel, PulsePair, TickRate},
};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::{
    thread::JoinHandle,
    time::{Duration, Instant},
};

/// A [ReplayServiceInput] tells [ReplayHardwareService] what to do.
#[derive(Debug)]
pub enum ReplayServiceInput {
    /// Asks the service to exit.
    Quit,
    /// Starts consuming words. A new service plays automatically upon
    /// creation.
    Play,
    /// Stops consuming words. The queue fills up, and producers wait.
    Pause,
}

/// A [ReplayServiceEvent] informs clients what's going on.
#[derive(Debug, PartialEq)]
pub enum ReplayServiceEvent {
    /// The service has started. Provides the tick rate (`None` if unpaced)
    /// and the queue depth.
    Reset(Option<TickRate>, usize),
    /// Words replayed since the last event of this kind. Only sent if the
    /// service was created with capture enabled.
    Replayed(Vec<PulsePair>),
    /// A tick came due and the queue was empty. Sent once per dry spell.
    Underrun,
    /// The service exited after replaying this many words.
    Stopped {
        #[allow(missing_docs)]
        words: u64,
        #[allow(missing_docs)]
        underruns: u64,
    },
}

/// How often the replay thread wakes up to catch up on due ticks.
const SERVICE_PERIOD: Duration = Duration::from_millis(1);

struct Replayer {
    queue: ReplayQueue,
    tick_rate: Option<TickRate>,
    capture: bool,
    receiver: Receiver<ReplayServiceInput>,
    sender: Sender<ReplayServiceEvent>,

    words: u64,
    underruns: u64,
    in_underrun: bool,

    // Pacing is measured from here. Moved forward whenever the queue runs dry
    // or playback resumes, so idle time never turns into a backlog of due
    // ticks.
    epoch: Instant,
    words_at_epoch: u64,
}
impl Replayer {
    fn run(mut self) {
        let mut playing = true;
        self.reanchor();
        loop {
            let input = if playing {
                match self.receiver.recv_timeout(SERVICE_PERIOD) {
                    Ok(input) => Some(input),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match self.receiver.recv() {
                    Ok(input) => Some(input),
                    Err(_) => break,
                }
            };
            match input {
                Some(ReplayServiceInput::Quit) => break,
                Some(ReplayServiceInput::Play) => {
                    if !playing {
                        playing = true;
                        self.reanchor();
                    }
                }
                Some(ReplayServiceInput::Pause) => playing = false,
                None => {}
            }
            if playing {
                self.replay_until(self.due());
            }
        }
        let _ = self.sender.send(ReplayServiceEvent::Stopped {
            words: self.words,
            underruns: self.underruns,
        });
    }

    fn reanchor(&mut self) {
        self.epoch = Instant::now();
        self.words_at_epoch = self.words;
    }

    /// How many words should have been replayed by now.
    fn due(&self) -> u64 {
        match self.tick_rate {
            Some(rate) => {
                self.words_at_epoch
                    + (self.epoch.elapsed().as_secs_f64() * rate.0 as f64) as u64
            }
            None => u64::MAX,
        }
    }

    fn replay_until(&mut self, due: u64) {
        let mut replayed = Vec::default();
        while self.words < due {
            match self.queue.pop() {
                Some(word) => {
                    self.words += 1;
                    self.in_underrun = false;
                    if self.capture {
                        replayed.push(PulsePair::from_word(word));
                    }
                }
                None => {
                    // Unpaced replay is never behind, so an empty queue isn't
                    // an underrun.
                    if self.tick_rate.is_some() && !self.in_underrun && self.words > 0 {
                        self.in_underrun = true;
                        self.underruns += 1;
                        let _ = self.sender.send(ReplayServiceEvent::Underrun);
                    }
                    if self.tick_rate.is_some() {
                        self.reanchor();
                    }
                    break;
                }
            }
        }
        if !replayed.is_empty() {
            let _ = self.sender.send(ReplayServiceEvent::Replayed(replayed));
        }
    }
}

/// [ReplayHardwareService] provides channel-based control of a thread that
/// consumes a [ReplayQueue] the way replay hardware would.
#[derive(Debug)]
pub struct ReplayHardwareService {
    inputs: CrossbeamChannel<ReplayServiceInput>,
    events: CrossbeamChannel<ReplayServiceEvent>,
    queue: ReplayQueue,
    handle: Option<JoinHandle<()>>,
}
impl ProvidesService<ReplayServiceInput, ReplayServiceEvent> for ReplayHardwareService {
    fn sender(&self) -> &Sender<ReplayServiceInput> {
        &self.inputs.sender
    }

    fn receiver(&self) -> &Receiver<ReplayServiceEvent> {
        &self.events.receiver
    }
}
impl ReplayHardwareService {
    /// Starts draining `queue`. With a `tick_rate`, one word is consumed per
    /// tick; without one, words are consumed as fast as they arrive. With
    /// `capture`, every replayed word is reported in a
    /// [ReplayServiceEvent::Replayed] event.
    pub fn new_with(queue: ReplayQueue, tick_rate: Option<TickRate>, capture: bool) -> Self {
        let inputs: CrossbeamChannel<ReplayServiceInput> = Default::default();
        let events: CrossbeamChannel<ReplayServiceEvent> = Default::default();
        let _ = events
            .sender
            .send(ReplayServiceEvent::Reset(tick_rate, queue.capacity()));

        let replayer = Replayer {
            queue: queue.clone(),
            tick_rate,
            capture,
            receiver: inputs.receiver.clone(),
            sender: events.sender.clone(),
            words: 0,
            underruns: 0,
            in_underrun: false,
            epoch: Instant::now(),
            words_at_epoch: 0,
        };
        let handle = std::thread::spawn(move || replayer.run());
        log::debug!(
            "Replay service started: {} words deep, {}",
            queue.capacity(),
            tick_rate.map_or("unpaced".to_string(), |rate| format!("{} ticks/s", rate.0))
        );
        Self {
            inputs,
            events,
            queue,
            handle: Some(handle),
        }
    }

    /// The queue this service drains. Hand a clone to the session.
    pub fn queue(&self) -> &ReplayQueue {
        &self.queue
    }

    /// Asks the replay thread to exit and waits for it.
    pub fn quit(&mut self) {
        self.send_input(ReplayServiceInput::Quit);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Replay service thread panicked");
            }
        }
    }

    /// Returns the next event if one is waiting.
    pub fn try_event(&self) -> Option<ReplayServiceEvent> {
        match self.events.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
impl Drop for ReplayHardwareService {
    fn drop(&mut self) {
        self.quit();
    }
}
