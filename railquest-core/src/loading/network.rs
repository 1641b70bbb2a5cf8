//! Streaming access to the network dataset.
//!
//! The dataset is far too large to hold in memory, so sources hand features
//! to a visitor one at a time. A feature that fails to deserialize is counted
//! and skipped; a broken file (I/O error, invalid JSON structure) fails the
//! whole stream.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};

use super::config::{DatasetFormat, SpatialConfig};
use super::raw_types::RawNetworkFeature;
use crate::Error;

/// Counters of one pass over a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub read: usize,
    pub malformed: usize,
    /// The visitor asked to stop before the end of the dataset
    pub stopped_early: bool,
}

/// A sequence of network features that can be streamed repeatedly
pub trait NetworkSource: Send + Sync {
    /// Feeds every feature to `visit` until the dataset ends or `visit` breaks.
    ///
    /// # Errors
    ///
    /// [`Error::IndexUnavailable`] if the dataset cannot be opened,
    /// [`Error::CacheBuildFailure`] if reading fails part way through.
    fn stream(
        &self,
        visit: &mut dyn FnMut(RawNetworkFeature) -> ControlFlow<()>,
    ) -> Result<StreamStats, Error>;
}

impl NetworkSource for Vec<RawNetworkFeature> {
    fn stream(
        &self,
        visit: &mut dyn FnMut(RawNetworkFeature) -> ControlFlow<()>,
    ) -> Result<StreamStats, Error> {
        let mut stats = StreamStats::default();
        for feature in self {
            stats.read += 1;
            if visit(feature.clone()).is_break() {
                stats.stopped_early = true;
                break;
            }
        }
        Ok(stats)
    }
}

/// GeoJSON network dataset on disk
#[derive(Debug, Clone)]
pub struct GeoJsonFileSource {
    path: PathBuf,
    format: DatasetFormat,
}

/// Creates the file source described by the configuration
pub fn open_source(config: &SpatialConfig) -> Arc<dyn NetworkSource> {
    Arc::new(GeoJsonFileSource::new(
        config.dataset_path.clone(),
        config.dataset_format,
    ))
}

impl GeoJsonFileSource {
    pub fn new(path: impl Into<PathBuf>, format: DatasetFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    fn open(&self) -> Result<BufReader<File>, Error> {
        File::open(&self.path).map(BufReader::new).map_err(|e| {
            Error::IndexUnavailable(format!(
                "Failed to open network dataset '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    fn stream_sequence(
        &self,
        reader: BufReader<File>,
        visit: &mut dyn FnMut(RawNetworkFeature) -> ControlFlow<()>,
    ) -> Result<StreamStats, Error> {
        let mut stats = StreamStats::default();
        let values = serde_json::Deserializer::from_reader(reader).into_iter::<serde_json::Value>();
        for value in values {
            let value = value.map_err(|e| self.build_failure(&e))?;
            if feed(value, &mut stats, visit).is_break() {
                stats.stopped_early = true;
                break;
            }
        }
        Ok(stats)
    }

    fn stream_collection(
        &self,
        reader: BufReader<File>,
        visit: &mut dyn FnMut(RawNetworkFeature) -> ControlFlow<()>,
    ) -> Result<StreamStats, Error> {
        let mut stats = StreamStats::default();
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        let seed = CollectionSeed {
            visit,
            stats: &mut stats,
        };
        match seed.deserialize(&mut deserializer) {
            Ok(()) => Ok(stats),
            Err(_) if stats.stopped_early => Ok(stats),
            Err(e) => Err(self.build_failure(&e)),
        }
    }

    fn build_failure(&self, e: &serde_json::Error) -> Error {
        Error::CacheBuildFailure(format!(
            "Failed to read network dataset '{}': {}",
            self.path.display(),
            e
        ))
    }
}

impl NetworkSource for GeoJsonFileSource {
    fn stream(
        &self,
        visit: &mut dyn FnMut(RawNetworkFeature) -> ControlFlow<()>,
    ) -> Result<StreamStats, Error> {
        let reader = self.open()?;
        match self.format {
            DatasetFormat::FeatureCollection => self.stream_collection(reader, visit),
            DatasetFormat::FeatureSequence => self.stream_sequence(reader, visit),
        }
    }
}

fn feed(
    value: serde_json::Value,
    stats: &mut StreamStats,
    visit: &mut dyn FnMut(RawNetworkFeature) -> ControlFlow<()>,
) -> ControlFlow<()> {
    stats.read += 1;
    match serde_json::from_value::<RawNetworkFeature>(value) {
        Ok(feature) => visit(feature),
        Err(e) => {
            log::trace!("Skipping malformed network feature: {e}");
            stats.malformed += 1;
            ControlFlow::Continue(())
        }
    }
}

const STOPPED: &str = "stream stopped by visitor";

/// Walks the top-level object and streams the `features` array
struct CollectionSeed<'a, F: ?Sized> {
    visit: &'a mut F,
    stats: &'a mut StreamStats,
}

struct FeaturesSeed<'a, F: ?Sized> {
    visit: &'a mut F,
    stats: &'a mut StreamStats,
}

impl<'de, F> DeserializeSeed<'de> for CollectionSeed<'_, F>
where
    F: FnMut(RawNetworkFeature) -> ControlFlow<()> + ?Sized,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, F> Visitor<'de> for CollectionSeed<'_, F>
where
    F: FnMut(RawNetworkFeature) -> ControlFlow<()> + ?Sized,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a GeoJSON FeatureCollection")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let CollectionSeed { visit, stats } = self;
        while let Some(key) = map.next_key::<String>()? {
            if key == "features" {
                map.next_value_seed(FeaturesSeed {
                    visit: &mut *visit,
                    stats: &mut *stats,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

impl<'de, F> DeserializeSeed<'de> for FeaturesSeed<'_, F>
where
    F: FnMut(RawNetworkFeature) -> ControlFlow<()> + ?Sized,
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, F> Visitor<'de> for FeaturesSeed<'_, F>
where
    F: FnMut(RawNetworkFeature) -> ControlFlow<()> + ?Sized,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of GeoJSON features")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let FeaturesSeed { visit, stats } = self;
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            stats.read += 1;
            match serde_json::from_value::<RawNetworkFeature>(value) {
                Ok(feature) => {
                    if visit(feature).is_break() {
                        stats.stopped_early = true;
                        // Aborting the parse is the only way to stop reading early
                        return Err(de::Error::custom(STOPPED));
                    }
                }
                Err(e) => {
                    log::trace!("Skipping malformed network feature: {e}");
                    stats.malformed += 1;
                }
            }
        }
        Ok(())
    }
}
