/// Tests for Texture resource

use crate::error::Error;
use crate::renderer::{ContextInfo, ContextType, GraphicsDevice, HeadlessDevice, TextureFormat};
use super::*;

fn acquired_device() -> HeadlessDevice {
    let mut device = HeadlessDevice::new();
    device.on_context_acquired(ContextInfo {
        context_type: ContextType::Headless,
        major_version: 1,
        minor_version: 0,
    }).unwrap();
    device
}

#[test]
fn test_from_desc_checks_data_size() {
    let result = Texture::from_desc(TextureDesc {
        name: "short".to_string(),
        width: 4,
        height: 4,
        format: TextureFormat::Rgba8,
        data: vec![0; 15],
    });
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_from_desc_rejects_zero_size() {
    let result = Texture::from_desc(TextureDesc {
        name: "empty".to_string(),
        width: 0,
        height: 4,
        format: TextureFormat::Luminance8,
        data: Vec::new(),
    });
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_upload_once_per_context() {
    let mut device = acquired_device();
    let texture = Texture::from_desc(TextureDesc {
        name: "gray".to_string(),
        width: 2,
        height: 2,
        format: TextureFormat::Luminance8,
        data: vec![128; 4],
    }).unwrap();

    let handle = texture.ensure_texture(&mut device).unwrap();
    assert_eq!(texture.ensure_texture(&mut device).unwrap(), handle);
    assert_eq!(device.counters().textures_uploaded, 1);

    device.on_context_lost();
    assert!(!texture.is_uploaded(&device));
}

#[test]
fn test_release_destroys_live_handle() {
    let mut device = acquired_device();
    let texture = Texture::solid("red", [255, 0, 0, 255]);
    texture.ensure_texture(&mut device).unwrap();

    texture.release(&mut device).unwrap();
    assert!(texture.handle().is_none());
    assert_eq!(device.counters().objects_destroyed, 1);
}
