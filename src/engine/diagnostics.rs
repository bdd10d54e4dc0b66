use std::io::Write;

use log::warn;

use crate::prelude::Epoch;

/// Optional per epoch diagnostic streams.
/// Ratio lines: `"{epoch index} {ratio}"`,
/// bootstrap lines: `"{epoch index} {success rate in %}"`.
#[derive(Default)]
pub struct Diagnostics {
    ratio: Option<Box<dyn Write>>,
    bootstrap: Option<Box<dyn Write>>,
    epoch: Option<Epoch>,
    index: usize,
}

impl Diagnostics {
    pub fn set_ratio_stream(&mut self, stream: Box<dyn Write>) {
        self.ratio = Some(stream);
    }

    pub fn set_bootstrap_stream(&mut self, stream: Box<dyn Write>) {
        self.bootstrap = Some(stream);
    }

    /// Epoch counter, increments on each new [Epoch]
    pub fn epoch_index(&self) -> usize {
        self.index
    }

    pub(crate) fn new_epoch(&mut self, t: Epoch) {
        match self.epoch {
            Some(prev) if prev == t => {},
            Some(_) => {
                self.index += 1;
                self.epoch = Some(t);
            },
            None => {
                self.epoch = Some(t);
            },
        }
    }

    pub(crate) fn record(&mut self, ratio: f64, bootstrap: f64) {
        let index = self.index;

        if let Some(stream) = self.ratio.as_mut() {
            if let Err(e) = writeln!(stream, "{} {:.3}", index, ratio) {
                warn!("ratio diagnostics: {}", e);
            }
        }

        if let Some(stream) = self.bootstrap.as_mut() {
            if let Err(e) = writeln!(stream, "{} {:.2}", index, bootstrap * 100.0) {
                warn!("bootstrap diagnostics: {}", e);
            }
        }
    }
}
