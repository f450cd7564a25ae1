use std::io::Cursor;
use std::sync::Arc;

use truyenff_bubbles::image_data::{PNG_MIME, decode_image_data, encode_data_url};
use truyenff_bubbles::{
    AnchorPolicy, ComposeOptions, Compositor, DialogueLine, FontBook, PanelMeta,
};

fn white_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn compositor(output_mime: &str) -> Compositor {
    Compositor::new(
        Arc::new(FontBook::estimated()),
        ComposeOptions {
            output_mime: output_mime.to_string(),
            anchor_policy: AnchorPolicy::FitRendered,
            show_speaker: true,
        },
    )
}

fn pixel(bytes: &[u8], x: u32, y: u32) -> [u8; 4] {
    let image = image::load_from_memory(bytes).expect("decode output").to_rgba8();
    image.get_pixel(x, y).0
}

#[test]
fn angry_bubble_is_painted_near_the_top_right() {
    let output = compositor(PNG_MIME)
        .add_dialogue_bytes(
            white_png(400, 300),
            PanelMeta {
                scene_type: Some("confrontation"),
                camera_angle: Some("close_up"),
                emotion: Some("angry"),
            },
            DialogueLine {
                speaker: Some("Lão Quái"),
                text: "Hi",
            },
        )
        .expect("composite");

    let decoded = image::load_from_memory(&output).expect("decode");
    assert_eq!((decoded.width(), decoded.height()), (400, 300));
    // anchor (280, 50); the spiky body spans x 180..380
    assert_eq!(pixel(&output, 200, 50), [0xFF, 0xE6, 0xE6, 0xFF]);
    assert_eq!(pixel(&output, 10, 290), [0xFF, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn thought_bubble_trails_circles_below_the_body() {
    let output = compositor(PNG_MIME)
        .add_dialogue_bytes(
            white_png(400, 300),
            PanelMeta {
                scene_type: None,
                camera_angle: Some("close_up"),
                emotion: Some("thinking"),
            },
            DialogueLine {
                speaker: None,
                text: "Hmm",
            },
        )
        .expect("composite");
    // bottom edge at 74.6; the largest trail circle is centered at (250, 94.6)
    assert_eq!(pixel(&output, 250, 95), [0xF0, 0xF0, 0xF0, 0xFF]);
}

#[test]
fn data_url_round_trip_keeps_dimensions() {
    let input = encode_data_url(&white_png(512, 640), PNG_MIME);
    let output = compositor("image/jpeg")
        .add_dialogue(
            &input,
            PanelMeta {
                scene_type: Some("dialogue"),
                camera_angle: Some("wide_shot"),
                emotion: Some("sad"),
            },
            DialogueLine {
                speaker: Some("Mai"),
                text: "We should leave before the rain reaches the valley",
            },
        )
        .expect("composite");
    assert!(output.starts_with("data:image/jpeg;base64,"));
    let decoded = decode_image_data(&output).expect("decode output");
    assert_eq!(decoded.mime, "image/jpeg");
    assert_eq!((decoded.width, decoded.height), (512, 640));
}

#[test]
fn translucent_base_keeps_its_colour_outside_the_bubble() {
    let image = image::RgbaImage::from_pixel(400, 400, image::Rgba([255, 0, 0, 128]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");

    let output = compositor(PNG_MIME)
        .add_dialogue_bytes(
            bytes,
            PanelMeta::default(),
            DialogueLine {
                speaker: None,
                text: "Hi",
            },
        )
        .expect("composite");
    let [r, g, b, a] = pixel(&output, 5, 395);
    assert!(r >= 254, "red channel darkened to {r}");
    assert_eq!((g, b), (0, 0));
    assert!(a.abs_diff(128) <= 1, "alpha {a}");
}

#[test]
fn malformed_image_data_is_an_error() {
    let err = compositor(PNG_MIME)
        .add_dialogue(
            "data:image/png;base64,bm90IGFuIGltYWdl",
            PanelMeta::default(),
            DialogueLine {
                speaker: None,
                text: "Hello",
            },
        )
        .unwrap_err();
    assert!(err.to_string().contains("not a recognized image"));
}
