//! Placement solver - picks a spawn point in the ring around a station
//!
//! Candidates are drawn uniformly by *area* over the annulus
//! `[min_distance, max_distance]`, so docks are not bunched towards the inner
//! edge. The first candidate clear of every occupied location wins.
//!
//! Only dock-to-dock separation is checked here. Collisions with station
//! geometry are the host's call at creation time.

use std::f32::consts::TAU;

use rand::Rng;
use thiserror::Error;

use crate::components::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementFailure {
    #[error("no clear location found in {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Inputs for one placement
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest<'a> {
    pub origin: Vec2,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Locations of docks that are currently active
    pub occupied: &'a [Vec2],
    pub min_separation: f32,
    pub max_attempts: u32,
}

/// Sample a point uniformly by area in the ring around `origin`.
///
/// `min_distance == max_distance` degenerates to a point on the circle.
pub fn sample_annulus(origin: Vec2, min_distance: f32, max_distance: f32, rng: &mut impl Rng) -> Vec2 {
    let inner_sq = min_distance * min_distance;
    let outer_sq = max_distance * max_distance;

    let u: f32 = rng.gen();
    let radius = (u * (outer_sq - inner_sq) + inner_sq)
        .sqrt()
        .clamp(min_distance, max_distance);
    let angle = rng.gen_range(0.0..TAU);

    origin + Vec2::from_angle(angle) * radius
}

/// Find a location for a new dock, or give up after `max_attempts` samples
pub fn solve(request: &PlacementRequest<'_>, rng: &mut impl Rng) -> Result<Vec2, PlacementFailure> {
    let separation_sq = request.min_separation * request.min_separation;

    for _ in 0..request.max_attempts {
        let candidate = sample_annulus(request.origin, request.min_distance, request.max_distance, rng);
        let clear = request
            .occupied
            .iter()
            .all(|other| other.distance_squared(&candidate) >= separation_sq);
        if clear {
            return Ok(candidate);
        }
    }

    Err(PlacementFailure::Exhausted {
        attempts: request.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request(occupied: &[Vec2]) -> PlacementRequest<'_> {
        PlacementRequest {
            origin: Vec2::ZERO,
            min_distance: 64.0,
            max_distance: 256.0,
            occupied,
            min_separation: 32.0,
            max_attempts: 32,
        }
    }

    #[test]
    fn test_samples_stay_in_annulus() {
        let mut rng = StdRng::seed_from_u64(1);
        let origin = Vec2::new(500.0, -300.0);
        for _ in 0..10_000 {
            let p = sample_annulus(origin, 64.0, 256.0, &mut rng);
            let d = p.distance(&origin);
            assert!((64.0 - 1e-2..=256.0 + 1e-2).contains(&d), "distance {} out of range", d);
        }
    }

    #[test]
    fn test_squared_radius_is_uniform() {
        let mut rng = StdRng::seed_from_u64(2024);
        let (inner_sq, outer_sq) = (64.0f32 * 64.0, 256.0f32 * 256.0);
        let mut buckets = [0u32; 10];

        for _ in 0..10_000 {
            let p = sample_annulus(Vec2::ZERO, 64.0, 256.0, &mut rng);
            let t = (p.length() * p.length() - inner_sq) / (outer_sq - inner_sq);
            let bucket = ((t * 10.0) as usize).min(9);
            buckets[bucket] += 1;
        }

        // Expected 1000 per bucket; standard deviation is ~30
        for (i, count) in buckets.iter().enumerate() {
            assert!((850..=1150).contains(count), "bucket {} has {} samples", i, count);
        }
    }

    #[test]
    fn test_degenerate_annulus_samples_circle() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let p = sample_annulus(Vec2::ZERO, 100.0, 100.0, &mut rng);
            assert!(p.is_finite());
            assert!((p.length() - 100.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_zero_inner_radius() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..100 {
            let p = sample_annulus(Vec2::ZERO, 0.0, 10.0, &mut rng);
            assert!(p.length() <= 10.0 + 1e-3);
        }
    }

    #[test]
    fn test_empty_space_accepts_first_sample() {
        let mut a = StdRng::seed_from_u64(5);
        let mut b = StdRng::seed_from_u64(5);

        let solved = solve(&request(&[]), &mut a).unwrap();
        let first = sample_annulus(Vec2::ZERO, 64.0, 256.0, &mut b);
        assert_eq!(solved, first);
    }

    #[test]
    fn test_respects_separation() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut occupied = Vec::new();
        for _ in 0..8 {
            if let Ok(p) = solve(&request(&occupied), &mut rng) {
                assert!(occupied.iter().all(|o: &Vec2| o.distance(&p) >= 32.0 - 1e-3));
                occupied.push(p);
            }
        }
        assert!(!occupied.is_empty());
    }

    #[test]
    fn test_crowded_space_is_exhausted() {
        let mut rng = StdRng::seed_from_u64(7);
        let occupied = [Vec2::ZERO];
        let crowded = PlacementRequest {
            min_separation: 1_000.0,
            max_attempts: 5,
            ..request(&occupied)
        };
        assert_eq!(solve(&crowded, &mut rng), Err(PlacementFailure::Exhausted { attempts: 5 }));
    }

    #[test]
    fn test_zero_attempts_fails_immediately() {
        let mut rng = StdRng::seed_from_u64(8);
        let none = PlacementRequest {
            max_attempts: 0,
            ..request(&[])
        };
        assert!(solve(&none, &mut rng).is_err());
    }
}
