use rand::{
    Rng,
    prelude::Distribution,
};

use crate::splat::cloud::{
    Splat,
    SplatCloud,
};


impl Distribution<Splat> for rand::distributions::Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Splat {
        Splat {
            rotation: [
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
                rng.gen_range(-1.0f32..1.0),
            ].into(),
            position: [
                rng.gen_range(-20.0f32..20.0),
                rng.gen_range(-20.0f32..20.0),
                rng.gen_range(-20.0f32..20.0),
            ],
            scale: [
                rng.gen_range(0.0f32..1.0),
                rng.gen_range(0.0f32..1.0),
                rng.gen_range(0.0f32..1.0),
            ].into(),
            color: [
                rng.r#gen::<u8>(),
                rng.r#gen::<u8>(),
                rng.r#gen::<u8>(),
                rng.gen_range(0..=204u8),
            ].into(),
        }
    }
}

pub fn random_splats(n: usize) -> SplatCloud {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| rng.r#gen::<Splat>())
        .collect()
}
