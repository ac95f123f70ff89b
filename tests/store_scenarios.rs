use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose};
use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, ImageFormat, Rgba, RgbaImage};

use image_inspector::image_store::{
    FrameSize, ImageError, ImageSource, ImageStore, OutputFormat, Rgba8Color,
};

fn unique_temp_dir() -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock error")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("image-inspector-scenario-{nanos}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn two_frame_gif() -> Vec<u8> {
    let red = RgbaImage::from_pixel(6, 4, Rgba([255, 0, 0, 255]));
    let blue = RgbaImage::from_pixel(6, 4, Rgba([0, 0, 255, 255]));

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder
            .encode_frames(vec![
                Frame::from_parts(red, 0, 0, Delay::from_numer_denom_ms(100, 1)),
                Frame::from_parts(blue, 0, 0, Delay::from_numer_denom_ms(100, 1)),
            ])
            .expect("encode gif");
    }
    bytes
}

#[test]
fn create_solid_red_and_export_png() {
    let store = ImageStore::default();
    let color = Rgba8Color::parse_hex("#FF0000FF").expect("parse color");
    let image = store.create(4, 2, 1, Some(color)).expect("create image");

    let pixels = image.get_pixels(0).expect("get pixels");
    assert_eq!(pixels.len(), 4 * 2 * 4);
    assert!(pixels.chunks_exact(4).all(|px| px == [255, 0, 0, 255]));

    let encoded = image.encode(0, OutputFormat::Png).expect("encode png");
    let decoded = image::load_from_memory_with_format(&encoded.bytes, ImageFormat::Png)
        .expect("decode png")
        .to_rgba8();
    assert_eq!(decoded.dimensions(), (4, 2));
    assert_eq!(decoded.into_raw(), pixels);
}

#[test]
fn animated_gif_file_loads_every_frame() {
    let dir = unique_temp_dir();
    let path = dir.join("anim.gif");
    std::fs::write(&path, two_frame_gif()).expect("write gif");

    let store = ImageStore::default();
    let path_str = path.to_string_lossy().to_string();
    let image = store.load(&path_str).expect("load gif");

    assert_eq!(image.frame_count(), 2);
    assert_eq!(image.source_path(), path_str);
    assert_eq!(
        image.frame_sizes().expect("sizes"),
        vec![FrameSize { width: 6, height: 4 }; 2]
    );

    let first = image.get_pixels(0).expect("frame 0");
    let second = image.get_pixels(1).expect("frame 1");
    assert!(first[0] > first[2], "first frame should be red");
    assert!(second[2] > second[0], "second frame should be blue");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn png_base64_roundtrip_preserves_pixels() {
    let mut source = RgbaImage::new(5, 3);
    for (x, y, px) in source.enumerate_pixels_mut() {
        *px = Rgba([(x * 40) as u8, (y * 80) as u8, 7, 200]);
    }
    let mut png = Vec::new();
    source
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .expect("encode source png");

    let store = ImageStore::default();
    let data_url = format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(&png));
    let image = store
        .load_source(ImageSource::Base64(data_url))
        .expect("load base64");

    assert_eq!(image.source_path(), "");
    assert_eq!(image.get_pixels(0).expect("pixels"), source.as_raw().clone());

    let exported = image.encode_base64(0, Some("png")).expect("export base64");
    let bytes = general_purpose::STANDARD.decode(exported).expect("decode base64");
    let reloaded = image::load_from_memory(&bytes).expect("decode export").to_rgba8();
    assert_eq!(reloaded, source);
}

#[test]
fn uploaded_bytes_with_unknown_content_are_not_stored() {
    let store = ImageStore::default();
    let result = store.load_source(ImageSource::Bytes {
        bytes: b"definitely not an image".to_vec(),
        file_name: Some("note.png".to_string()),
    });

    assert!(result.is_none());
    assert!(store.is_empty());
}

#[test]
fn downscale_then_export_every_format() {
    let store = ImageStore::default();
    let image = store
        .create(64, 32, 3, Some(Rgba8Color::new(10, 200, 30, 255)))
        .expect("create image");

    assert!(image.downscale(0.25, image::imageops::FilterType::Triangle).expect("downscale"));
    assert_eq!(
        image.frame_sizes().expect("sizes"),
        vec![FrameSize { width: 16, height: 8 }; 3]
    );
    assert_eq!(image.scaling_factor().expect("factor"), 0.25);

    for format in OutputFormat::ALL {
        let encoded = image.encode(2, format).expect("encode frame");
        assert_eq!(encoded.size, FrameSize { width: 16, height: 8 });
        assert_eq!(encoded.mime_type(), format.mime_type());
        assert!(!encoded.bytes.is_empty());
    }
}

#[test]
fn removed_handle_reports_disposed() {
    let store = ImageStore::default();
    let image = store.create(2, 2, 1, None).expect("create image");

    assert!(store.remove(&image.id()));
    assert!(matches!(image.get_pixels(0), Err(ImageError::Disposed(_))));
    assert!(matches!(
        image.encode(0, OutputFormat::Png),
        Err(ImageError::Disposed(_))
    ));
    assert_eq!(image.frame_count(), 0);
}
