//! Embedded fallback payloads served when no static asset resolves.

/// Default root page.
pub(crate) const ROOT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>littleserve</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 3rem auto; max-width: 36rem; color: #222; }
    code { background: #f2f2f2; padding: 0.1rem 0.3rem; border-radius: 3px; }
  </style>
</head>
<body>
  <h1>littleserve</h1>
  <p>The HTTP server is up. No <code>index.html</code> was found under the
  static mount, so you are looking at the built-in page.</p>
</body>
</html>
"#;

/// Default favicon: a 1x1 32-bit ICO.
#[rustfmt::skip]
pub(crate) const FAVICON_ICO: &[u8] = &[
    // ICONDIR: reserved, type 1 (icon), one image
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
    // ICONDIRENTRY: 1x1, 32 bpp, 48 bytes at offset 22
    0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00,
    0x30, 0x00, 0x00, 0x00, 0x16, 0x00, 0x00, 0x00,
    // BITMAPINFOHEADER: 1x(1*2), 32 bpp, 8 image bytes
    0x28, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x20, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // XOR pixel (BGRA) and AND mask row
    0xd8, 0x7d, 0x36, 0xff, 0x00, 0x00, 0x00, 0x00,
];
