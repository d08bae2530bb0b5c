//! # Events Module
//!
//! Message-passing between pipeline workers and whoever is listening.
//!
//! ## Design
//! Stages never block on the consumer: events go through an unbounded
//! channel, and a dropped receiver simply discards them. The scan stage
//! emits one [`ScanEvent::Record`] per file; the analyze stage emits
//! [`AnalyzeEvent::Batch`]es of payloads.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Scan(ScanEvent::Record(r)) => println!("found {}", r.path.display()),
//!             Event::Analyze(AnalyzeEvent::Batch(b)) => println!("{} analysed", b.len()),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! orchestrator.run_blocking(sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
