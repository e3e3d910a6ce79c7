use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::CityImage;

/// Pick up to `count` distinct photos from `pool`, without replacement.
pub fn select_images<R>(pool: &[CityImage], count: usize, rng: &mut R) -> Vec<CityImage>
where
    R: Rng + ?Sized,
{
    pool.choose_multiple(rng, count).cloned().collect()
}
