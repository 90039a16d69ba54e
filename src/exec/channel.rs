// src/exec/channel.rs

//! Channel allocation for an N-stage pipeline.
//!
//! Every channel is an OS pipe created close-on-exec, so a stage only ever
//! holds the duplicates installed on its own stdin/stdout. Each endpoint is
//! an [`Endpoint`]: it closes itself on drop and refuses a second close.

use std::io::{self, PipeReader, PipeWriter};
use std::process::Stdio;

use tracing::{debug, trace};

use crate::errors::{EndpointSide, PipexecError, Result};

/// An OS pipe end that can be duplicated and handed to a child process.
pub trait PipeEnd: Sized + Into<Stdio> {
    const SIDE: EndpointSide;

    fn try_clone_end(&self) -> io::Result<Self>;
}

impl PipeEnd for PipeReader {
    const SIDE: EndpointSide = EndpointSide::Read;

    fn try_clone_end(&self) -> io::Result<Self> {
        self.try_clone()
    }
}

impl PipeEnd for PipeWriter {
    const SIDE: EndpointSide = EndpointSide::Write;

    fn try_clone_end(&self) -> io::Result<Self> {
        self.try_clone()
    }
}

/// One side of a channel, closable exactly once.
#[derive(Debug)]
pub struct Endpoint<T: PipeEnd> {
    channel: usize,
    end: Option<T>,
}

impl<T: PipeEnd> Endpoint<T> {
    fn new(channel: usize, end: T) -> Self {
        Self {
            channel,
            end: Some(end),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_some()
    }

    pub fn side(&self) -> EndpointSide {
        T::SIDE
    }

    /// Close this endpoint. A second call is an error.
    pub fn close(&mut self) -> Result<()> {
        match self.end.take() {
            Some(end) => {
                drop(end);
                let side = T::SIDE;
                trace!(channel = self.channel, %side, "closed channel endpoint");
                Ok(())
            }
            None => Err(self.closed_error()),
        }
    }

    /// Duplicate the endpoint into a `Stdio` for a child process.
    ///
    /// The duplicate is independent: the child's copy lives until the child
    /// exits, ours until [`Endpoint::close`] or drop.
    pub fn to_stdio(&self) -> Result<Stdio> {
        let end = self.end.as_ref().ok_or_else(|| self.closed_error())?;
        Ok(end.try_clone_end()?.into())
    }

    fn closed_error(&self) -> PipexecError {
        PipexecError::EndpointClosed {
            channel: self.channel,
            side: T::SIDE,
        }
    }
}

/// A unidirectional byte stream from stage `index` to stage `index + 1`.
#[derive(Debug)]
pub struct Channel {
    index: usize,
    read: Endpoint<PipeReader>,
    write: Endpoint<PipeWriter>,
}

impl Channel {
    fn open(index: usize) -> io::Result<Self> {
        let (reader, writer) = io::pipe()?;
        Ok(Self {
            index,
            read: Endpoint::new(index, reader),
            write: Endpoint::new(index, writer),
        })
    }

    #[cfg(test)]
    fn index(&self) -> usize {
        self.index
    }

    #[cfg(test)]
    fn read_end(&self) -> &Endpoint<PipeReader> {
        &self.read
    }

    #[cfg(test)]
    fn write_end(&self) -> &Endpoint<PipeWriter> {
        &self.write
    }

    #[cfg(test)]
    fn read_end_mut(&mut self) -> &mut Endpoint<PipeReader> {
        &mut self.read
    }

    #[cfg(test)]
    fn write_end_mut(&mut self) -> &mut Endpoint<PipeWriter> {
        &mut self.write
    }
}

/// The supervisor's handle on every channel of one pipeline run.
#[derive(Debug)]
pub struct ChannelSet {
    channels: Vec<Channel>,
}

impl ChannelSet {
    /// Create the `stages - 1` channels an N-stage pipeline needs.
    ///
    /// Nothing is returned on partial failure; channels opened so far are
    /// dropped (and closed) before the error surfaces.
    pub fn allocate(stages: usize) -> Result<Self> {
        let requested = stages.saturating_sub(1);
        let channels = (0..requested)
            .map(Channel::open)
            .collect::<io::Result<Vec<_>>>()
            .map_err(|source| PipexecError::Allocation { requested, source })?;

        debug!(channels = channels.len(), stages, "allocated pipeline channels");
        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True for a single-stage pipeline.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    #[cfg(test)]
    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    #[cfg(test)]
    fn get_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    /// Stdin for `stage`: a duplicate of the previous channel's read end, or
    /// `None` for stage 0.
    pub fn stdin_for(&self, stage: usize) -> Option<Result<Stdio>> {
        let prev = stage.checked_sub(1)?;
        self.channels.get(prev).map(|c| c.read.to_stdio())
    }

    /// Stdout for `stage`: a duplicate of its own channel's write end, or
    /// `None` for the last stage.
    pub fn stdout_for(&self, stage: usize) -> Option<Result<Stdio>> {
        self.channels.get(stage).map(|c| c.write.to_stdio())
    }

    /// Number of endpoints (both sides, all channels) still open.
    pub fn open_endpoints(&self) -> usize {
        self.channels
            .iter()
            .map(|c| usize::from(c.read.is_open()) + usize::from(c.write.is_open()))
            .sum()
    }

    /// Close every endpoint still open and return how many were closed.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for channel in &mut self.channels {
            trace!(channel = channel.index, "releasing channel");
            if channel.read.close().is_ok() {
                closed += 1;
            }
            if channel.write.close().is_ok() {
                closed += 1;
            }
        }
        debug!(closed, "released supervisor channel endpoints");
        closed
    }
}
