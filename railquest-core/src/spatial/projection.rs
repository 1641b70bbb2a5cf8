//! Coordinate system of the network dataset.
//!
//! Edges are indexed and snapped in geographic coordinates (longitude,
//! latitude in degrees). Datasets published in a projected system are
//! converted while the index is built.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Coord, Rect, coord};
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 6;
const CONVERGENCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObliqueMercatorParams {
    /// Latitude of the projection centre in degrees
    pub lat_0: f64,
    /// Longitude of the projection centre in degrees
    pub lon_0: f64,
    pub k_0: f64,
    pub x_0: f64,
    pub y_0: f64,
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
}

/// Coordinate system of the dataset geometries
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    /// Longitude and latitude in degrees, no conversion needed
    #[default]
    Geographic,
    /// Swiss-style oblique Mercator on an ellipsoid
    ObliqueMercator(ObliqueMercatorParams),
}

impl Projection {
    /// Swiss LV95 (EPSG:2056) on the Bessel ellipsoid.
    ///
    /// No datum shift is applied, results are within about a hundred metres
    /// of WGS84.
    pub fn swiss_lv95() -> Self {
        Projection::ObliqueMercator(ObliqueMercatorParams {
            lat_0: 46.952_405_555_555_56,
            lon_0: 7.439_583_333_333_333,
            k_0: 1.0,
            x_0: 2_600_000.0,
            y_0: 1_200_000.0,
            semi_major_axis: 6_377_397.155,
            inverse_flattening: 299.152_812_8,
        })
    }

    pub(crate) fn reprojector(&self) -> Reprojector {
        match self {
            Projection::Geographic => Reprojector::Identity,
            Projection::ObliqueMercator(params) => {
                Reprojector::ObliqueMercator(ObliqueMercator::new(*params))
            }
        }
    }
}

/// Converts between dataset coordinates and geographic coordinates
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reprojector {
    Identity,
    ObliqueMercator(ObliqueMercator),
}

impl Reprojector {
    /// Dataset coordinate to (longitude, latitude)
    pub(crate) fn to_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Reprojector::Identity => c,
            Reprojector::ObliqueMercator(p) => p.inverse(c),
        }
    }

    /// (longitude, latitude) to dataset coordinate
    pub(crate) fn from_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Reprojector::Identity => c,
            Reprojector::ObliqueMercator(p) => p.forward(c),
        }
    }

    /// Envelope in dataset coordinates of a geographic rectangle.
    ///
    /// The rectangle is sampled on a 3x3 grid, which over tile-sized areas
    /// bounds the curved image of its edges closely enough.
    pub(crate) fn source_envelope(&self, rect: Rect<f64>) -> Rect<f64> {
        if let Reprojector::Identity = self {
            return rect;
        }
        let (min, max) = (rect.min(), rect.max());
        let mut lo = coord! { x: f64::INFINITY, y: f64::INFINITY };
        let mut hi = coord! { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY };
        for i in 0..3 {
            for j in 0..3 {
                let sample = coord! {
                    x: min.x + (max.x - min.x) * f64::from(i) / 2.0,
                    y: min.y + (max.y - min.y) * f64::from(j) / 2.0,
                };
                let projected = self.from_geographic(sample);
                lo.x = lo.x.min(projected.x);
                lo.y = lo.y.min(projected.y);
                hi.x = hi.x.max(projected.x);
                hi.y = hi.y.max(projected.y);
            }
        }
        Rect::new(lo, hi)
    }
}

/// Precomputed constants of the oblique Mercator (somerc) projection
#[derive(Debug, Clone, Copy)]
pub(crate) struct ObliqueMercator {
    params: ObliqueMercatorParams,
    e: f64,
    es: f64,
    hlf_e: f64,
    c: f64,
    k: f64,
    k_r: f64,
    sinp0: f64,
    cosp0: f64,
    lon_0: f64,
}

impl ObliqueMercator {
    fn new(params: ObliqueMercatorParams) -> Self {
        let f = 1.0 / params.inverse_flattening;
        let es = 2.0 * f - f * f;
        let e = es.sqrt();
        let hlf_e = 0.5 * e;
        let phi0 = params.lat_0.to_radians();

        let cp = phi0.cos().powi(2);
        let c = (1.0 + es * cp * cp / (1.0 - es)).sqrt();
        let sp = phi0.sin();
        let sinp0 = sp / c;
        let phip0 = sinp0.asin();
        let cosp0 = phip0.cos();
        let esp = sp * e;
        let k = (FRAC_PI_4 + 0.5 * phip0).tan().ln()
            - c * ((FRAC_PI_4 + 0.5 * phi0).tan().ln()
                - hlf_e * ((1.0 + esp) / (1.0 - esp)).ln());
        let k_r = params.k_0 * (1.0 - es).sqrt() / (1.0 - esp * esp);

        Self {
            params,
            e,
            es,
            hlf_e,
            c,
            k,
            k_r,
            sinp0,
            cosp0,
            lon_0: params.lon_0.to_radians(),
        }
    }

    fn forward(&self, geographic: Coord<f64>) -> Coord<f64> {
        let phi = geographic.y.to_radians();
        let lam = geographic.x.to_radians() - self.lon_0;

        let sp = self.e * phi.sin();
        let phip = 2.0
            * (self.c
                * ((FRAC_PI_4 + 0.5 * phi).tan().ln()
                    - self.hlf_e * ((1.0 + sp) / (1.0 - sp)).ln())
                + self.k)
                .exp()
                .atan()
            - FRAC_PI_2;
        let lamp = self.c * lam;
        let cp = phip.cos();
        let phipp = (self.cosp0 * phip.sin() - self.sinp0 * cp * lamp.cos()).asin();
        let lampp = (cp * lamp.sin() / phipp.cos()).asin();

        let a = self.params.semi_major_axis;
        coord! {
            x: a * self.k_r * lampp + self.params.x_0,
            y: a * self.k_r * (FRAC_PI_4 + 0.5 * phipp).tan().ln() + self.params.y_0,
        }
    }

    fn inverse(&self, projected: Coord<f64>) -> Coord<f64> {
        let a = self.params.semi_major_axis;
        let x = (projected.x - self.params.x_0) / a;
        let y = (projected.y - self.params.y_0) / a;

        let phipp = 2.0 * ((y / self.k_r).exp().atan() - FRAC_PI_4);
        let lampp = x / self.k_r;
        let cp = phipp.cos();
        let mut phip = (self.cosp0 * phipp.sin() + self.sinp0 * cp * lampp.cos()).asin();
        let lamp = (cp * lampp.sin() / phip.cos()).asin();

        let con = (self.k - (FRAC_PI_4 + 0.5 * phip).tan().ln()) / self.c;
        for _ in 0..MAX_ITERATIONS {
            let esp = self.e * phip.sin();
            let delta = (con + (FRAC_PI_4 + 0.5 * phip).tan().ln()
                - self.hlf_e * ((1.0 + esp) / (1.0 - esp)).ln())
                * (1.0 - esp * esp)
                * phip.cos()
                / (1.0 - self.es);
            phip -= delta;
            if delta.abs() < CONVERGENCE {
                break;
            }
        }

        coord! {
            x: (lamp / self.c + self.lon_0).to_degrees(),
            y: phip.to_degrees(),
        }
    }
}
