//! Application event loop.
//!
//! This module wires the [`ScreenController`] and the [`WgpuEngine`] into a
//! winit application. The host is responsible for the one asynchronous step:
//! loading the cube map and acquiring the GPU context, which is driven on a
//! tokio runtime natively and on the browser's executor on the web.
//!
//! # Lifecycle Flow
//!
//! 1. `resumed` creates the window and starts the cube map load
//! 2. the load result and the GPU context reach the controller, which sets up
//!    the engine and registers its per-frame callback
//! 3. every `RedrawRequested` ticks the engine, running the callback; rendering
//!    requests the next redraw
//! 4. `CloseRequested` disposes the controller and exits
//!

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    context::Context,
    engine::Engine,
    render::WgpuEngine,
    resources::{Assets, texture::CubeFaces},
    screen::{ScreenConfig, ScreenController},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Loaded {
        faces: anyhow::Result<CubeFaces>,
        context: anyhow::Result<Context>,
    },
}
impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded { faces, context } => f
                .debug_struct("Loaded")
                .field("faces", &faces.as_ref().map(|faces| faces.size()))
                .field("context", &context.is_ok())
                .finish(),
        }
    }
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    window: Option<Arc<Window>>,
    controller: ScreenController,
    engine: WgpuEngine,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: ScreenConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            window: None,
            controller: ScreenController::new(config),
            engine: WgpuEngine::new(),
        })
    }

    fn on_loaded(
        &mut self,
        event_loop: &ActiveEventLoop,
        faces: anyhow::Result<CubeFaces>,
        context: anyhow::Result<Context>,
    ) {
        // the controller logs and records failures itself
        let result = match context {
            Ok(context) => self
                .controller
                .on_texture_loaded(&mut self.engine, context, faces),
            Err(e) => self
                .controller
                .on_surface_failed(e.context("cannot create the main context")),
        };
        if result.is_err() {
            event_loop.exit();
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("ray transmission");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let load = self.controller.load_texture(Assets);
        let init_future = async move {
            let faces = load.await;
            let context = Context::new(window).await;
            (faces, context)
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let (faces, context) = self.async_runtime.block_on(init_future);
            self.on_loaded(event_loop, faces, context);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let (faces, context) = init_future.await;
                if proxy
                    .send_event(FlowEvent::Loaded { faces, context })
                    .is_err()
                {
                    log::warn!("event loop closed before the cube map finished loading");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Loaded { faces, context } => self.on_loaded(event_loop, faces, context),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        self.engine.controls_mut().handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => {
                self.controller.dispose(&mut self.engine);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.engine.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.engine.tick() {
                    match e.downcast_ref::<wgpu::SurfaceError>() {
                        // Reconfigure the surface if it's lost or outdated
                        Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            self.engine.reconfigure();
                            if let Some(ctx) = self.engine.context() {
                                ctx.request_redraw();
                            }
                        }
                        _ => log::error!("Unable to render {e:#}"),
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn run(config: ScreenConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
