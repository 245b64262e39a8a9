use wgpu::CompositeAlphaMode;

/// What the renderer does after failing to acquire a swapchain texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Swapchain rebuilt; the next frame can render.
    Reconfigured,
    SkipFrame,
    /// Out of memory; the render call fails.
    Fatal,
}

pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| formats.contains(f)) {
            return Some(f);
        }
    }

    formats.first().copied()
}

/// Picks the requested alpha mode, or the closest supported one.
///
/// A premultiplied request degrades to post-multiplied before giving up on
/// compositing altogether.
pub(crate) fn choose_alpha_mode(
    available: &[CompositeAlphaMode],
    requested: Option<CompositeAlphaMode>,
) -> CompositeAlphaMode {
    let fallbacks: &[CompositeAlphaMode] = match requested {
        Some(CompositeAlphaMode::PreMultiplied) => &[
            CompositeAlphaMode::PreMultiplied,
            CompositeAlphaMode::PostMultiplied,
        ],
        Some(CompositeAlphaMode::Opaque) => &[CompositeAlphaMode::Opaque],
        _ => &[],
    };

    requested
        .filter(|m| available.contains(m))
        .or_else(|| fallbacks.iter().copied().find(|m| available.contains(m)))
        .or_else(|| available.first().copied())
        .unwrap_or(CompositeAlphaMode::Auto)
}

/// Largest supported count not above `requested`, from 1, 2, 4, 8, 16.
pub(crate) fn choose_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    [16, 8, 4, 2]
        .into_iter()
        .filter(|&n| n <= requested)
        .find(|&n| supported(n))
        .unwrap_or(1)
}

pub(crate) fn map_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
