use byte_unit::{Byte, UnitType};
use clap::Parser;

use bevy_splat_mesh::{
    SplatCloud,
    TextureLayout,
    build_encoded_layout,
    random_splats,
    render::texture::TextureSize,
};


/// reports the texture grids a splat cloud of the given size encodes into
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// number of random splats, ignored with --test-model
    #[arg(short, long, default_value_t = 100_000)]
    count: usize,

    #[arg(long, default_value_t = 4096)]
    base_width: u32,

    #[arg(long, default_value_t = 1024)]
    base_height: u32,

    /// encode the 5x5 test model instead of random splats
    #[arg(long)]
    test_model: bool,
}


fn describe(name: &str, size: TextureSize) {
    // both textures hold two 32-bit channels per texel
    let bytes = Byte::from_u64(size.texel_count() as u64 * 8);

    println!(
        "{name}: {}x{} texels, {}",
        size.width,
        size.height,
        bytes.get_appropriate_unit(UnitType::Binary),
    );
}

fn main() {
    let args = Args::parse();

    let cloud = if args.test_model {
        SplatCloud::test_model()
    } else {
        random_splats(args.count)
    };

    let layout = TextureLayout {
        base_width: args.base_width,
        base_height: args.base_height,
    };

    println!("encoding {} splats", cloud.len());

    let encoded = build_encoded_layout(&cloud, &layout);

    describe("covariances", encoded.covariance_size);
    describe("centers and colors", encoded.center_color_size);
}
