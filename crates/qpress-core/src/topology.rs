//! Route and center topology, keyed by zone.
//!
//! A [`TopologyRegistry`] is built once (from the built-in field data or from
//! data files), validated, and then only read. Every simulation run borrows
//! it, so parallel runs never share mutable state.

use crate::error::ConfigError;
use crate::fixed::{f64_to_fixed64, Fixed64, Minutes};
use crate::id::CenterId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lower bound applied to truck speed before dividing by it.
pub const MIN_SPEED_KMH: f64 = 1e-6;

/// One leg of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from: String,
    pub to: String,
    pub km: f64,
    /// Declared driving time. Takes precedence over `km / speed`.
    #[serde(default)]
    pub hours: Option<f64>,
}

impl RouteSegment {
    pub fn new(from: &str, to: &str, km: f64, hours: Option<f64>) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            km,
            hours,
        }
    }

    /// Whole minutes needed to drive this segment (truncated).
    pub fn travel_minutes(&self, speed_kmh: f64) -> Minutes {
        match self.hours {
            Some(h) => (h * 60.0) as Minutes,
            None => leg_minutes(self.km, speed_kmh),
        }
    }
}

/// Whole minutes to drive `km` at `speed_kmh` (truncated).
pub fn leg_minutes(km: f64, speed_kmh: f64) -> Minutes {
    (km / speed_kmh.max(MIN_SPEED_KMH) * 60.0) as Minutes
}

/// An intake center with its own cake bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub name: String,
    /// Solids fraction of the slurry received at this center.
    #[serde(alias = "TS_in")]
    pub ts_in: f64,
    /// Maximum feed flow the center can supply (m³/h).
    pub m3_demand: f64,
    /// Bin capacity in tonnes of cake.
    pub batea_capacity_t: f64,
}

impl Center {
    pub fn new(name: &str, ts_in: f64, m3_demand: f64, batea_capacity_t: f64) -> Self {
        Self {
            name: name.to_string(),
            ts_in,
            m3_demand,
            batea_capacity_t,
        }
    }
}

/// A named topology: an ordered route and one center per route destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub key: String,
    pub route: Vec<RouteSegment>,
    pub centers: Vec<Center>,
}

impl Zone {
    pub fn center(&self, id: CenterId) -> Option<&Center> {
        self.centers.get(id.index())
    }

    pub fn center_id(&self, name: &str) -> Option<CenterId> {
        self.centers
            .iter()
            .position(|c| c.name == name)
            .map(|i| CenterId(i as u32))
    }

    pub fn total_km(&self) -> f64 {
        self.route.iter().map(|s| s.km).sum()
    }

    /// Sum of declared hours; segments without a declared time count as zero.
    pub fn total_declared_hours(&self) -> f64 {
        self.route.iter().filter_map(|s| s.hours).sum()
    }

    /// Minutes to drive the whole route once.
    pub fn total_route_minutes(&self, speed_kmh: f64) -> Minutes {
        self.route.iter().map(|s| s.travel_minutes(speed_kmh)).sum()
    }

    /// Distance and driving minutes from the route start up to and including
    /// the segment that ends at `center`.
    pub fn cumulative_to(&self, center: CenterId, speed_kmh: f64) -> (f64, Minutes) {
        self.route
            .iter()
            .take(center.index() + 1)
            .fold((0.0, 0), |(km, min), s| {
                (km + s.km, min + s.travel_minutes(speed_kmh))
            })
    }

    /// Resolve driving times and distances for a truck speed.
    pub fn plan(&self, speed_kmh: f64) -> RoutePlan {
        let legs = self
            .route
            .iter()
            .map(|s| Leg {
                minutes: s.travel_minutes(speed_kmh),
                km: f64_to_fixed64(s.km),
            })
            .collect();
        let trips = (0..self.centers.len())
            .map(|i| {
                let (km, outbound_minutes) = self.cumulative_to(CenterId(i as u32), speed_kmh);
                Trip {
                    one_way_km: f64_to_fixed64(km),
                    outbound_minutes,
                    return_minutes: leg_minutes(km, speed_kmh),
                }
            })
            .collect();
        RoutePlan {
            legs,
            trips,
            total_minutes: self.total_route_minutes(speed_kmh),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.route.is_empty() {
            return Err(ConfigError::EmptyRoute(self.key.clone()));
        }
        if self.route.len() != self.centers.len() {
            return Err(ConfigError::CenterCountMismatch {
                zone: self.key.clone(),
                segments: self.route.len(),
                centers: self.centers.len(),
            });
        }
        for seg in &self.route {
            check_finite("km", seg.km)?;
            if seg.km < 0.0 {
                return Err(ConfigError::Negative {
                    field: "km",
                    value: seg.km,
                });
            }
            if let Some(h) = seg.hours {
                check_finite("hours", h)?;
                if h < 0.0 {
                    return Err(ConfigError::Negative {
                        field: "hours",
                        value: h,
                    });
                }
            }
        }
        for (position, (center, seg)) in self.centers.iter().zip(&self.route).enumerate() {
            if center.name != seg.to {
                return Err(ConfigError::CenterRouteMismatch {
                    zone: self.key.clone(),
                    position,
                    center: center.name.clone(),
                    segment_to: seg.to.clone(),
                });
            }
            if self.centers[..position].iter().any(|c| c.name == center.name) {
                return Err(ConfigError::DuplicateCenter {
                    zone: self.key.clone(),
                    center: center.name.clone(),
                });
            }
            check_finite("batea_capacity_t", center.batea_capacity_t)?;
            if center.batea_capacity_t <= 0.0 {
                return Err(ConfigError::NonPositiveCapacity {
                    center: center.name.clone(),
                    capacity: center.batea_capacity_t,
                });
            }
            check_fraction("TS_in", center.ts_in)?;
            check_finite("m3_demand", center.m3_demand)?;
            if center.m3_demand < 0.0 {
                return Err(ConfigError::Negative {
                    field: "m3_demand",
                    value: center.m3_demand,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Route plan
// ---------------------------------------------------------------------------

/// One route segment resolved for a truck speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub minutes: Minutes,
    pub km: Fixed64,
}

/// A distribution round trip from the route start to one center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trip {
    /// Distance from the route start to the center.
    pub one_way_km: Fixed64,
    /// Sum of segment driving times up to the center.
    pub outbound_minutes: Minutes,
    /// Straight `km / speed` back to the start.
    pub return_minutes: Minutes,
}

/// A zone's route with every duration resolved, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePlan {
    /// Per segment, in route order.
    pub legs: Vec<Leg>,
    /// Per center, in route order.
    pub trips: Vec<Trip>,
    /// Minutes to drive the whole route once.
    pub total_minutes: Minutes,
}

pub(crate) fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

pub(crate) fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    check_finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { field, value })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing an immutable [`TopologyRegistry`].
/// Two-phase lifecycle: registration (with optional mutation) -> build.
#[derive(Debug, Default)]
pub struct TopologyRegistryBuilder {
    zones: Vec<Zone>,
}

impl TopologyRegistryBuilder {
    pub fn new() -> Self {
        Self { zones: Vec::new() }
    }

    /// Start from the built-in zones.
    pub fn with_builtin_zones() -> Self {
        Self {
            zones: builtin_zones(),
        }
    }

    /// Register a zone. Validation is deferred to [`build`](Self::build).
    pub fn register_zone(
        &mut self,
        key: &str,
        route: Vec<RouteSegment>,
        centers: Vec<Center>,
    ) -> &mut Self {
        self.zones.push(Zone {
            key: key.to_string(),
            route,
            centers,
        });
        self
    }

    /// Mutate an already registered zone by key.
    pub fn mutate_zone<F>(&mut self, key: &str, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Zone),
    {
        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.key == key)
            .ok_or_else(|| ConfigError::UnknownZone(key.to_string()))?;
        f(zone);
        Ok(())
    }

    /// Validate every zone and freeze the registry.
    pub fn build(self) -> Result<TopologyRegistry, ConfigError> {
        let mut index = HashMap::with_capacity(self.zones.len());
        for (i, zone) in self.zones.iter().enumerate() {
            zone.validate()?;
            if index.insert(zone.key.clone(), i).is_some() {
                return Err(ConfigError::DuplicateZone(zone.key.clone()));
            }
        }
        Ok(TopologyRegistry {
            zones: self.zones,
            index,
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable zone registry. Frozen after build. Thread-safe to share.
#[derive(Debug, Clone)]
pub struct TopologyRegistry {
    zones: Vec<Zone>,
    index: HashMap<String, usize>,
}

impl TopologyRegistry {
    /// The built-in field zones `NORTE` and `SUR`.
    pub fn builtin() -> Self {
        let zones = builtin_zones();
        let index = zones
            .iter()
            .enumerate()
            .map(|(i, z)| (z.key.clone(), i))
            .collect();
        Self { zones, index }
    }

    pub fn zone(&self, key: &str) -> Result<&Zone, ConfigError> {
        self.index
            .get(key)
            .map(|&i| &self.zones[i])
            .ok_or_else(|| ConfigError::UnknownZone(key.to_string()))
    }

    pub fn route(&self, key: &str) -> Result<&[RouteSegment], ConfigError> {
        self.zone(key).map(|z| z.route.as_slice())
    }

    pub fn centers(&self, key: &str) -> Result<&[Center], ConfigError> {
        self.zone(key).map(|z| z.centers.as_slice())
    }

    /// Zone keys in registration order.
    pub fn zone_keys(&self) -> impl Iterator<Item = &str> {
        self.zones.iter().map(|z| z.key.as_str())
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }
}

impl Default for TopologyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// ---------------------------------------------------------------------------
// Built-in field data
// ---------------------------------------------------------------------------

fn zone(key: &str, legs: &[(&str, &str, f64, f64)], demands: &[f64]) -> Zone {
    let route = legs
        .iter()
        .map(|&(from, to, km, hours)| RouteSegment::new(from, to, km, Some(hours)))
        .collect::<Vec<_>>();
    let centers = route
        .iter()
        .zip(demands)
        .map(|(seg, &demand)| Center::new(&seg.to, 0.05, demand, 15.0))
        .collect();
    Zone {
        key: key.to_string(),
        route,
        centers,
    }
}

fn builtin_zones() -> Vec<Zone> {
    vec![
        zone(
            "NORTE",
            &[
                ("Puerto Varas", "Curarrehue", 357.00, 4.17),
                ("Curarrehue", "Catripulli", 13.43, 0.22),
                ("Catripulli", "Melipeuco", 175.00, 2.48),
                ("Melipeuco", "Caburga 2", 170.00, 2.47),
                ("Caburga 2", "Codihue", 116.00, 0.78),
            ],
            &[6.0, 5.0, 6.0, 4.0, 5.0],
        ),
        zone(
            "SUR",
            &[
                ("Puerto Varas", "Hornopirén", 126.00, 2.43),
                ("Hornopirén", "Pargua", 167.00, 2.83),
                ("Pargua", "Reloncaví", 43.96, 0.73),
                ("Reloncaví", "Centro Innovación ATC", 11.87, 0.20),
                ("Centro Innovación ATC", "Agua Buena", 80.30, 1.34),
                ("Agua Buena", "Aucar", 61.47, 1.02),
            ],
            &[6.0, 5.0, 5.0, 5.0, 5.0, 5.0],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round2(v: f64) -> f64 {
        (v * 100.0).round() / 100.0
    }

    fn two_stop() -> (Vec<RouteSegment>, Vec<Center>) {
        (
            vec![
                RouteSegment::new("Base", "A", 60.0, None),
                RouteSegment::new("A", "B", 30.0, Some(0.25)),
            ],
            vec![Center::new("A", 0.05, 6.0, 10.0), Center::new("B", 0.05, 4.0, 10.0)],
        )
    }

    #[test]
    fn builtin_zones_pass_validation() {
        let reg = TopologyRegistryBuilder::with_builtin_zones().build().unwrap();
        assert_eq!(reg.zone_count(), 2);
        assert_eq!(reg.zone_keys().collect::<Vec<_>>(), vec!["NORTE", "SUR"]);
    }

    #[test]
    fn builtin_route_totals_match_field_data() {
        let reg = TopologyRegistry::builtin();
        let norte = reg.zone("NORTE").unwrap();
        let sur = reg.zone("SUR").unwrap();
        assert_eq!(round2(norte.total_km()), 831.43);
        assert_eq!(round2(norte.total_declared_hours()), 10.12);
        assert_eq!(round2(sur.total_km()), 490.6);
        assert_eq!(round2(sur.total_declared_hours()), 8.55);
    }

    #[test]
    fn centers_follow_route_order() {
        let reg = TopologyRegistry::builtin();
        let route = reg.route("SUR").unwrap();
        let centers = reg.centers("SUR").unwrap();
        for (seg, center) in route.iter().zip(centers) {
            assert_eq!(seg.to, center.name);
        }
        assert_eq!(centers[0].m3_demand, 6.0);
        assert!(centers.iter().all(|c| c.batea_capacity_t == 15.0));
    }

    #[test]
    fn unknown_zone_is_config_error() {
        let reg = TopologyRegistry::builtin();
        assert_eq!(
            reg.route("ESTE").unwrap_err(),
            ConfigError::UnknownZone("ESTE".to_string())
        );
        assert!(reg.centers("").is_err());
    }

    #[test]
    fn declared_hours_take_precedence_over_speed() {
        let seg = RouteSegment::new("A", "B", 120.0, Some(0.5));
        assert_eq!(seg.travel_minutes(60.0), 30);
        let seg = RouteSegment::new("A", "B", 120.0, None);
        assert_eq!(seg.travel_minutes(60.0), 120);
    }

    #[test]
    fn travel_minutes_truncate() {
        // 4.17 h = 250.2 min
        let seg = RouteSegment::new("A", "B", 357.0, Some(4.17));
        assert_eq!(seg.travel_minutes(60.0), 250);
        assert_eq!(leg_minutes(50.0, 60.0), 50);
    }

    #[test]
    fn zero_speed_is_guarded() {
        let m = leg_minutes(1.0, 0.0);
        assert!(m > 0);
    }

    #[test]
    fn cumulative_to_includes_destination_segment() {
        let (route, centers) = two_stop();
        let mut b = TopologyRegistryBuilder::new();
        b.register_zone("T", route, centers);
        let reg = b.build().unwrap();
        let zone = reg.zone("T").unwrap();
        assert_eq!(zone.cumulative_to(CenterId(0), 60.0), (60.0, 60));
        assert_eq!(zone.cumulative_to(CenterId(1), 60.0), (90.0, 75));
        assert_eq!(zone.total_route_minutes(60.0), 75);
        assert_eq!(zone.center_id("B"), Some(CenterId(1)));
        assert_eq!(zone.center_id("Z"), None);
    }

    #[test]
    fn plan_resolves_trips_per_center() {
        let (route, centers) = two_stop();
        let mut b = TopologyRegistryBuilder::new();
        b.register_zone("T", route, centers);
        let reg = b.build().unwrap();
        let plan = reg.zone("T").unwrap().plan(60.0);
        assert_eq!(plan.legs[1].minutes, 15);
        assert_eq!(plan.legs[1].km, f64_to_fixed64(30.0));
        assert_eq!(plan.trips[1].one_way_km, f64_to_fixed64(90.0));
        assert_eq!(plan.trips[1].outbound_minutes, 75);
        // The return leg ignores declared hours.
        assert_eq!(plan.trips[1].return_minutes, 90);
        assert_eq!(plan.total_minutes, 75);
    }

    #[test]
    fn non_positive_capacity_rejected() {
        let (route, mut centers) = two_stop();
        centers[1].batea_capacity_t = 0.0;
        let mut b = TopologyRegistryBuilder::new();
        b.register_zone("T", route, centers);
        match b.build() {
            Err(ConfigError::NonPositiveCapacity { center, .. }) => assert_eq!(center, "B"),
            other => panic!("expected NonPositiveCapacity, got: {other:?}"),
        }
    }

    #[test]
    fn mismatched_center_rejected() {
        let (route, mut centers) = two_stop();
        centers.swap(0, 1);
        let mut b = TopologyRegistryBuilder::new();
        b.register_zone("T", route, centers);
        assert!(matches!(
            b.build(),
            Err(ConfigError::CenterRouteMismatch { position: 0, .. })
        ));
    }

    #[test]
    fn count_mismatch_rejected() {
        let (route, mut centers) = two_stop();
        centers.pop();
        let mut b = TopologyRegistryBuilder::new();
        b.register_zone("T", route, centers);
        assert!(matches!(
            b.build(),
            Err(ConfigError::CenterCountMismatch { segments: 2, centers: 1, .. })
        ));
    }

    #[test]
    fn empty_route_rejected() {
        let mut b = TopologyRegistryBuilder::new();
        b.register_zone("T", vec![], vec![]);
        assert_eq!(b.build().unwrap_err(), ConfigError::EmptyRoute("T".to_string()));
    }

    #[test]
    fn duplicate_zone_rejected() {
        let mut b = TopologyRegistryBuilder::with_builtin_zones();
        let (route, centers) = two_stop();
        b.register_zone("SUR", route, centers);
        assert_eq!(
            b.build().unwrap_err(),
            ConfigError::DuplicateZone("SUR".to_string())
        );
    }

    #[test]
    fn mutate_zone_changes_capacity() {
        let mut b = TopologyRegistryBuilder::with_builtin_zones();
        b.mutate_zone("SUR", |z| z.centers[0].batea_capacity_t = 2.0)
            .unwrap();
        let reg = b.build().unwrap();
        assert_eq!(reg.centers("SUR").unwrap()[0].batea_capacity_t, 2.0);
    }

    #[test]
    fn mutate_unknown_zone_fails() {
        let mut b = TopologyRegistryBuilder::new();
        assert!(b.mutate_zone("NORTE", |_| {}).is_err());
    }
}
