//! Decoded views over a sequence
//!
//! [`Documents`] maps each delivered match through a [`Decoder`] and yields
//! the decoded element. Matches that fail to decode are skipped and logged;
//! they never end the stream. Fetch failures do, and are yielded once as
//! `Err` before the stream ends.
//!
//! [`Ids`] yields just the id of every match.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use sift_core::{DecodeError, Match, Result};
use tracing::debug;

use crate::fetcher::{BatchFetcher, Fetcher};
use crate::sequence::LazySearchSequence;

/// Turns a match into a domain element
pub trait Decoder<T> {
    /// Decode one match.
    fn decode(&self, m: &Match) -> std::result::Result<T, DecodeError>;
}

impl<T, F> Decoder<T> for F
where
    F: Fn(&Match) -> std::result::Result<T, DecodeError>,
{
    fn decode(&self, m: &Match) -> std::result::Result<T, DecodeError> {
        self(m)
    }
}

/// Deserializes the match source with serde
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    /// Create a decoder for `T`
    pub fn new() -> Self {
        JsonDecoder {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> Decoder<T> for JsonDecoder<T> {
    fn decode(&self, m: &Match) -> std::result::Result<T, DecodeError> {
        let source = m
            .source
            .as_ref()
            .ok_or_else(|| DecodeError::new(&m.id, "match carries no source"))?;
        T::deserialize(source).map_err(|e| DecodeError::new(&m.id, e.to_string()))
    }
}

/// Stream of decoded elements
pub struct Documents<T, D, F: BatchFetcher = Fetcher> {
    sequence: LazySearchSequence<F>,
    decoder: D,
    skipped: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T, D: Decoder<T>, F: BatchFetcher> Documents<T, D, F> {
    /// Decode the matches of `sequence` with `decoder`
    pub fn new(sequence: LazySearchSequence<F>, decoder: D) -> Self {
        Documents {
            sequence,
            decoder,
            skipped: 0,
            _marker: PhantomData,
        }
    }

    /// Matches dropped because they could not be decoded
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// The underlying sequence
    pub fn sequence(&self) -> &LazySearchSequence<F> {
        &self.sequence
    }

    /// Stop the stream and release remote resources
    pub fn close(&mut self) {
        self.sequence.close();
    }
}

impl<T, D: Decoder<T>, F: BatchFetcher> Iterator for Documents<T, D, F> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        loop {
            let m = match self.sequence.next()? {
                Ok(m) => m,
                Err(e) => return Some(Err(e)),
            };
            match self.decoder.decode(&m) {
                Ok(element) => return Some(Ok(element)),
                Err(e) => {
                    self.skipped += 1;
                    debug!(target: "sift::documents", error = %e, "Skipping undecodable match");
                }
            }
        }
    }
}

/// Stream of match ids
pub struct Ids<F: BatchFetcher = Fetcher> {
    sequence: LazySearchSequence<F>,
}

impl<F: BatchFetcher> Ids<F> {
    /// Yield the ids of `sequence`
    pub fn new(sequence: LazySearchSequence<F>) -> Self {
        Ids { sequence }
    }

    /// Stop the stream and release remote resources
    pub fn close(&mut self) {
        self.sequence.close();
    }
}

impl<F: BatchFetcher> Iterator for Ids<F> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Result<String>> {
        self.sequence.next().map(|r| r.map(|m| m.id))
    }
}
