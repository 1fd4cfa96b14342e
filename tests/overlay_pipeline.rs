use image::{ImageFormat, Rgb, RgbImage};
use llm_text_overlay_rust::overlay::FontBook;
use llm_text_overlay_rust::settings::Settings;
use llm_text_overlay_rust::styles::all_styles;
use llm_text_overlay_rust::{GenerateRequest, Generator, OpenRouter, PlanSource};
use std::io::Cursor;

fn jpeg_source(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([120, 140, 160]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .expect("encode jpeg");
    bytes
}

#[tokio::test]
async fn long_text_wraps_within_eighty_percent_of_width() {
    let generator: Generator<OpenRouter> =
        Generator::new(Settings::default(), FontBook::empty(), None);
    let request = GenerateRequest {
        image: Some(jpeg_source(300, 200)),
        image_name: None,
        text: "Everything must go this weekend only at the harbour store".to_string(),
        style: "handwritten".to_string(),
    };
    let output = generator.generate(request).await.expect("generate");

    assert_eq!(output.source, PlanSource::Heuristic);
    assert!(output.lines.len() > 1);
    assert_eq!(output.geometry.max_width, 240);
    assert_eq!(output.geometry.x, 105);
    assert_eq!(output.geometry.y, 140);
    assert_eq!(output.geometry.font_size, 20);
    assert_eq!(
        output.lines.join(" "),
        "Everything must go this weekend only at the harbour store"
    );

    let decoded = image::load_from_memory(&output.jpeg).expect("decode");
    assert_eq!((decoded.width(), decoded.height()), (300, 200));
}

#[tokio::test]
async fn every_style_draws_text_with_installed_fonts() {
    let fonts = FontBook::load(&Settings::default()).expect("load fonts");
    if fonts.face_count() == 0 {
        eprintln!("no system fonts installed; skipping drawn-text check");
        return;
    }
    let generator: Generator<OpenRouter> = Generator::new(Settings::default(), fonts, None);
    let source = RgbImage::from_pixel(400, 300, Rgb([120, 140, 160]));
    let mut png = Vec::new();
    source
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .expect("encode png");

    for style in all_styles() {
        let output = generator
            .generate(GenerateRequest {
                image: Some(png.clone()),
                image_name: Some("plain.png".to_string()),
                text: "SALE".to_string(),
                style: style.key.to_string(),
            })
            .await
            .expect("generate");
        let decoded = image::load_from_memory(&output.jpeg)
            .expect("decode")
            .to_rgb8();
        let changed = decoded
            .pixels()
            .filter(|pixel| {
                pixel
                    .0
                    .iter()
                    .zip([120u8, 140, 160])
                    .map(|(got, was)| (*got as i32 - was as i32).abs())
                    .sum::<i32>()
                    > 90
            })
            .count();
        assert!(changed > 100, "{}: changed pixels = {}", style.key, changed);
    }
}
