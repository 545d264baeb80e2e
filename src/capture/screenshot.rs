//! Window capture using the Windows Graphics Capture API.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{Direct3D11CaptureFramePool, GraphicsCaptureItem};
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING, D3D11CreateDevice, ID3D11Device,
    ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
};
use windows::Win32::System::WinRT::Direct3D11::CreateDirect3D11DeviceFromDXGIDevice;
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;
use windows::core::Interface;

use super::buffer::{CaptureSource, PixelFormat, SourceFrame};
use super::window::{find_process_window, get_client_area_info, is_minimized};

const FRAME_TIMEOUT_SECS: u64 = 5;

/// Captures the client area of a process's window.
///
/// Each `frame` call grabs one frame and stores it as BGRA rows, bottom-up.
pub struct WindowCaptureSource {
    process_name: String,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl WindowCaptureSource {
    pub fn new(process_name: &str) -> Self {
        Self {
            process_name: process_name.to_string(),
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    fn capture(&mut self) -> Result<()> {
        let hwnd = find_process_window(&self.process_name)?;

        let (client_rect, client_offset) = get_client_area_info(hwnd)?;
        let crop_width = (client_rect.right - client_rect.left).max(0) as u32;
        let crop_height = (client_rect.bottom - client_rect.top).max(0) as u32;
        if crop_width == 0 || crop_height == 0 {
            return Err(anyhow!("Window client area is empty"));
        }

        let (device, context) = create_d3d11_device()?;
        let item = create_capture_item(hwnd)?;
        let size = item.Size()?;

        let d3d_device = create_direct3d_device(&device)?;
        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            1,
            size,
        )?;
        let session = frame_pool.CreateCaptureSession(&item)?;

        let frame_arrived = Arc::new(AtomicBool::new(false));
        let frame_arrived_clone = frame_arrived.clone();
        frame_pool.FrameArrived(&TypedEventHandler::new(
            move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
                frame_arrived_clone.store(true, Ordering::SeqCst);
                Ok(())
            },
        ))?;

        session.StartCapture()?;

        let start = std::time::Instant::now();
        while !frame_arrived.load(Ordering::SeqCst) {
            if start.elapsed().as_secs() > FRAME_TIMEOUT_SECS {
                session.Close()?;
                frame_pool.Close()?;
                return Err(anyhow!("Timeout waiting for frame"));
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let frame = frame_pool.TryGetNextFrame()?;
        let surface = frame.Surface()?;
        let access: windows::Win32::System::WinRT::Direct3D11::IDirect3DDxgiInterfaceAccess =
            surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };

        let staging_texture = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            device.CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("Failed to create staging texture"))?
        };

        unsafe {
            context.CopyResource(
                &staging_texture.cast::<ID3D11Resource>()?,
                &texture.cast::<ID3D11Resource>()?,
            );
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            context.Map(
                &staging_texture.cast::<ID3D11Resource>()?,
                0,
                D3D11_MAP_READ,
                0,
                Some(&mut mapped),
            )?;
            mapped
        };

        // Clamp the client area to the captured texture
        let crop_x = (client_offset.x.max(0) as u32).min(desc.Width);
        let crop_y = (client_offset.y.max(0) as u32).min(desc.Height);
        let crop_width = crop_width.min(desc.Width - crop_x);
        let crop_height = crop_height.min(desc.Height - crop_y);

        let row_pitch = mapped.RowPitch as usize;
        let src_data = unsafe {
            std::slice::from_raw_parts(mapped.pData as *const u8, row_pitch * desc.Height as usize)
        };

        let row_len = crop_width as usize * 4;
        self.data.resize(row_len * crop_height as usize, 0);
        for y in 0..crop_height as usize {
            let src_start = (crop_y as usize + y) * row_pitch + crop_x as usize * 4;
            // Stored bottom-up
            let dst_row = crop_height as usize - 1 - y;
            let dst_start = dst_row * row_len;
            self.data[dst_start..dst_start + row_len]
                .copy_from_slice(&src_data[src_start..src_start + row_len]);
        }
        self.width = crop_width;
        self.height = crop_height;

        unsafe {
            context.Unmap(&staging_texture.cast::<ID3D11Resource>()?, 0);
        }

        session.Close()?;
        frame_pool.Close()?;

        Ok(())
    }
}

impl CaptureSource for WindowCaptureSource {
    fn is_ready(&self) -> bool {
        match find_process_window(&self.process_name) {
            Ok(hwnd) => !is_minimized(hwnd),
            Err(_) => false,
        }
    }

    fn frame(&mut self) -> Option<SourceFrame<'_>> {
        if let Err(e) = self.capture() {
            crate::log(&format!("Window capture failed: {}", e));
            return None;
        }
        Some(SourceFrame {
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra8,
            data: &self.data,
        })
    }
}

/// Creates a Direct3D 11 device and immediate context.
fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("Failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("Failed to create D3D11 context"))?,
    ))
}

/// Wraps a D3D11 device in the WinRT device type the capture API expects.
fn create_direct3d_device(
    device: &ID3D11Device,
) -> Result<windows::Graphics::DirectX::Direct3D11::IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("Failed to cast to IDirect3DDevice")
}

fn create_capture_item(hwnd: HWND) -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("Failed to get IGraphicsCaptureItemInterop")?
    };

    unsafe {
        interop
            .CreateForWindow(hwnd)
            .context("Failed to create capture item for window")
    }
}
