use clap::{App, Arg};
use image::png::PNGEncoder;
use image::ColorType;
use std::{fs, fs::OpenOptions, io, path, process, time::Instant};

use whitted_raytracer::camera::Film;
use whitted_raytracer::progress::Progress;
use whitted_raytracer::scene;

const COLOR_SPACE: f64 = 255.99;

fn main() {
    // Define command line args
    let matches = App::new("Whitted raytracer")
        .arg(
            Arg::with_name("IN_SCENE_FILE")
                .help("The scene specification to render")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUT_FILEPATH")
                .help("The relative filepath to write the output image to")
                .required(true)
                .index(2),
        )
        .get_matches();

    // Grab a stamp for the start of the run
    let program_start = Instant::now();

    // Read the scene spec file
    let scene_spec_path = path::Path::new(matches.value_of("IN_SCENE_FILE").unwrap());
    let scene_str = fs::read_to_string(&scene_spec_path).expect("Failed to read scene spec file.");
    let scene = match scene::deserialize(
        &scene_str,
        match scene_spec_path.parent() {
            Some(p) => p,
            None => path::Path::new("/"),
        },
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to parse scene spec: {:?}", e);
            process::exit(1);
        }
    };

    // Create the output file according to input path
    let out_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(matches.value_of("OUT_FILEPATH").unwrap())
        .expect("Failed to create new file");
    let png_encoder = PNGEncoder::new(out_file);

    let res_x = scene.logistics.resolution_x;
    let res_y = scene.logistics.resolution_y;

    // One sequential pass over the pixel grid; rendering is deterministic
    // by contract.
    let mut progress = Progress::new(res_x as u64 * res_y as u64, io::stdout(), 20);
    let mut film = Film::new(res_x, res_y);
    for y in 0..res_y {
        for x in 0..res_x {
            film.set_pixel(x, y, scene.camera.render_pixel(&scene.world, x, y));
            progress.update(1);
        }
    }
    progress.done();

    // Gamma correct and quantize for display; the film itself stays
    // linear.
    let mut data = Vec::with_capacity((res_x * res_y * 3) as usize);
    for y in 0..res_y {
        for x in 0..res_x {
            let color = film.pixel(x, y).clamped();
            data.push((color.r.sqrt() * COLOR_SPACE) as u8);
            data.push((color.g.sqrt() * COLOR_SPACE) as u8);
            data.push((color.b.sqrt() * COLOR_SPACE) as u8);
        }
    }
    // Write the image to disk
    match png_encoder.encode(&data, res_x, res_y, ColorType::RGB(8)) {
        Ok(()) => println!(
            "Success! Took {} seconds",
            program_start.elapsed().as_secs_f64()
        ),
        Err(e) => {
            eprintln!("Failed to encode the png for output: {}", e);
            process::exit(1);
        }
    }
}
