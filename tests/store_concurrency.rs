use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use image::imageops::FilterType;
use image_inspector::image_store::{ImageError, ImageStore, OutputFormat, Rgba8Color};

#[test]
fn concurrent_creates_get_distinct_ids() {
    let store = Arc::new(ImageStore::default());
    let workers = 16;
    let per_worker = 8;

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            (0..per_worker)
                .map(|_| store.create(8, 8, 1, None).expect("create image").id())
                .collect::<Vec<_>>()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("worker thread should not panic") {
            assert!(ids.insert(id), "duplicate id {}", id);
        }
    }

    assert_eq!(ids.len(), workers * per_worker);
    assert_eq!(store.count(), workers * per_worker);
}

#[test]
fn concurrent_remove_succeeds_exactly_once() {
    let store = Arc::new(ImageStore::default());
    let image = store.create(4, 4, 2, None).expect("create image");
    let id = image.id();
    let successes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let successes = Arc::clone(&successes);
            thread::spawn(move || {
                if store.remove(&id) {
                    successes.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread should not panic");
    }

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert!(image.is_disposed());
    assert!(store.is_empty());
}

#[test]
fn readers_survive_concurrent_clear_all() {
    let store = Arc::new(ImageStore::default());
    let images: Vec<_> = (0..8)
        .map(|_| store.create(32, 32, 2, Some(Rgba8Color::new(1, 2, 3, 4))).expect("create image"))
        .collect();

    let mut handles = Vec::new();
    for image in images.iter().cloned() {
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                match image.encode(1, OutputFormat::Png) {
                    Ok(encoded) => assert_eq!(encoded.size.width, 32),
                    Err(ImageError::Disposed(_)) => break,
                    Err(other) => panic!("unexpected error: {}", other),
                }
            }
        }));
    }

    store.clear_all();

    for handle in handles {
        handle.join().expect("reader thread should not panic");
    }

    assert!(store.is_empty());
    assert!(images.iter().all(|image| image.is_disposed()));
}

#[test]
fn concurrent_downscale_and_read_see_consistent_geometry() {
    let store = ImageStore::default();
    let image = store.create(256, 128, 4, None).expect("create image");

    let reader = {
        let image = Arc::clone(&image);
        thread::spawn(move || {
            for _ in 0..100 {
                let sizes = image.frame_sizes().expect("sizes");
                assert!(sizes.windows(2).all(|pair| pair[0] == pair[1]));

                let pixels = image.get_pixels(3).expect("pixels");
                let valid_lens = [256 * 128 * 4, 128 * 64 * 4, 64 * 32 * 4, 32 * 16 * 4];
                assert!(valid_lens.contains(&pixels.len()), "torn frame of {} bytes", pixels.len());
            }
        })
    };

    for _ in 0..3 {
        image.downscale(0.5, FilterType::Nearest).expect("downscale");
    }
    reader.join().expect("reader thread should not panic");

    assert_eq!(image.scaling_factor().expect("factor"), 0.125);
    assert_eq!(image.frame_sizes().expect("sizes")[0].width, 32);
}
