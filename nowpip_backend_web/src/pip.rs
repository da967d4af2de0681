// Copyright 2026 the Nowpip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas, hidden video and the picture-in-picture/media-session APIs.
//!
//! ```text
//!   <canvas> ──captureStream(4)──► <video muted autoplay> ──► PiP window
//!      ▲                                  │
//!   CanvasPresenter                leavepictureinpicture
//! ```
//!
//! Both elements are created once, hidden, and appended to the document
//! element. Every asynchronous outcome (PiP grant, artwork decode, late
//! `play()` rejection, media-session action) is pushed onto the
//! [`Inbox`] and reaches the session on the next tick.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Size;
use nowpip_core::error::{Capability, HostError, Operation};
use nowpip_core::host::{ArtworkRequest, MediaAction, PipHost, WindowHandle};
use nowpip_core::render::{Font, Frame, Presenter};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    Document, Element, HtmlCanvasElement, HtmlElement, HtmlImageElement, HtmlVideoElement,
    MouseEvent,
};

use crate::canvas::CanvasPresenter;
use crate::listen::Listener;
use crate::observer::{Observer, Watch};
use crate::page::DomPage;
use crate::runtime::{Completion, Inbox};

/// Element id of the hidden canvas.
pub const CANVAS_ID: &str = "__nowpip_canvas";
/// Element id of the hidden video.
pub const VIDEO_ID: &str = "__nowpip_video";
/// Capture stream frame rate, matching the render loop.
const CAPTURE_FPS: f64 = 4.0;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = HtmlVideoElement)]
    type PipVideo;

    #[wasm_bindgen(extends = Document)]
    type PipDocument;

    #[wasm_bindgen(method, catch, js_name = "requestPictureInPicture")]
    fn request_picture_in_picture(this: &PipVideo) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method, getter, js_name = "pictureInPictureElement")]
    fn picture_in_picture_element(this: &PipDocument) -> Option<Element>;

    #[wasm_bindgen(method, catch, js_name = "exitPictureInPicture")]
    fn exit_picture_in_picture(this: &PipDocument) -> Result<js_sys::Promise, JsValue>;

    type MediaSession;

    #[wasm_bindgen(method, catch, js_name = "setActionHandler")]
    fn set_action_handler(
        this: &MediaSession,
        action: &str,
        handler: &JsValue,
    ) -> Result<(), JsValue>;
}

/// Best-effort text for a thrown JS value.
pub(crate) fn describe(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value.as_string().unwrap_or_else(|| String::from("unknown error"))
}

fn has_property(target: &JsValue, name: &str) -> bool {
    js_sys::Reflect::has(target, &JsValue::from_str(name)).unwrap_or(false)
}

struct Elements {
    presenter: CanvasPresenter,
    video: HtmlVideoElement,
    _listeners: [Listener; 2],
}

/// The [`PipHost`] for browsers with video picture-in-picture.
pub struct DomPipHost {
    page: DomPage,
    size: Size,
    inbox: Rc<Inbox>,
    elements: Option<Elements>,
    window: Option<(WindowHandle, JsValue)>,
    next_window: u32,
    play_observer: Option<Observer>,
    media_handlers: Vec<Closure<dyn FnMut()>>,
    stamp: u64,
}

impl core::fmt::Debug for DomPipHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomPipHost")
            .field("size", &self.size)
            .field("elements", &self.elements.is_some())
            .field("window", &self.window.as_ref().map(|(h, _)| *h))
            .field("play_observer", &self.play_observer.is_some())
            .field("media_handlers", &self.media_handlers.len())
            .finish_non_exhaustive()
    }
}

impl DomPipHost {
    pub(crate) fn new(page: DomPage, size: Size, inbox: Rc<Inbox>) -> Self {
        Self {
            page,
            size,
            inbox,
            elements: None,
            window: None,
            next_window: 1,
            play_observer: None,
            media_handlers: Vec::new(),
            stamp: 0,
        }
    }

    /// Records a granted PiP window and returns its handle.
    pub(crate) fn adopt_window(&mut self, window: JsValue) -> WindowHandle {
        let handle = WindowHandle(self.next_window);
        self.next_window = self.next_window.wrapping_add(1);
        self.window = Some((handle, window));
        handle
    }

    fn video(&self) -> Result<&HtmlVideoElement, HostError> {
        self.elements
            .as_ref()
            .map(|e| &e.video)
            .ok_or(HostError::MissingElement("video"))
    }

    fn build_elements(&self) -> Result<Elements, HostError> {
        let document = self.page.document();
        let root = document
            .document_element()
            .ok_or(HostError::MissingElement("documentElement"))?;

        let canvas: HtmlCanvasElement = find_or_create(document, &root, CANVAS_ID, "canvas")?;
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "layout size is a small positive pixel count"
        )]
        let (width, height) = (self.size.width as u32, self.size.height as u32);
        canvas.set_width(width);
        canvas.set_height(height);
        let video: HtmlVideoElement = find_or_create(document, &root, VIDEO_ID, "video")?;
        video.set_autoplay(true);
        video.set_muted(true);
        let _ = video.set_attribute("playsinline", "");

        let stream = canvas
            .capture_stream_with_frame_request_rate(CAPTURE_FPS)
            .map_err(|_| HostError::Unavailable(Capability::CaptureStream))?;
        video.set_src_object(Some(&stream));

        let setup_failed = |e: JsValue| HostError::rejected(Operation::CreateElements, describe(&e));
        let left = {
            let inbox = Rc::clone(&self.inbox);
            Listener::new(&video, "leavepictureinpicture", move |_| {
                inbox.push(Completion::LeftPip);
            })
            .map_err(setup_failed)?
        };
        let click = {
            let inbox = Rc::clone(&self.inbox);
            let target = canvas.clone();
            Listener::new(&canvas, "click", move |event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                let x = f64::from(event.offset_x());
                let shown = f64::from(target.client_width());
                let scale = if shown > 0.0 {
                    f64::from(target.width()) / shown
                } else {
                    1.0
                };
                inbox.push(Completion::Click(x * scale));
            })
            .map_err(setup_failed)?
        };

        let presenter = CanvasPresenter::new(canvas).map_err(setup_failed)?;
        Ok(Elements {
            presenter,
            video,
            _listeners: [left, click],
        })
    }
}

/// The element with `id`, or a new hidden `tag` element appended to `root`.
fn find_or_create<T: JsCast>(
    document: &Document,
    root: &Element,
    id: &str,
    tag: &'static str,
) -> Result<T, HostError> {
    let element = match document.get_element_by_id(id) {
        Some(existing) => existing,
        None => {
            let created = document
                .create_element(tag)
                .map_err(|_| HostError::MissingElement(tag))?;
            created.set_id(id);
            if let Some(html) = created.dyn_ref::<HtmlElement>() {
                let _ = html.style().set_property("display", "none");
            }
            root.append_child(&created)
                .map_err(|_| HostError::MissingElement(tag))?;
            created
        }
    };
    element
        .dyn_into::<T>()
        .map_err(|_| HostError::MissingElement(tag))
}

impl PipHost for DomPipHost {
    fn ensure_elements(&mut self) -> Result<(), HostError> {
        if self.elements.is_none() {
            self.elements = Some(self.build_elements()?);
        }
        Ok(())
    }

    fn pip_element_active(&self) -> bool {
        match (
            self.page
                .document()
                .unchecked_ref::<PipDocument>()
                .picture_in_picture_element(),
            &self.elements,
        ) {
            (Some(active), Some(elements)) => active.is_same_node(Some(elements.video.as_ref())),
            _ => false,
        }
    }

    fn request_pip(&mut self) -> Result<(), HostError> {
        let video = self.video()?;
        if !has_property(video, "requestPictureInPicture") {
            return Err(HostError::Unavailable(Capability::PictureInPicture));
        }
        let promise = video
            .unchecked_ref::<PipVideo>()
            .request_picture_in_picture()
            .map_err(|e| HostError::rejected(Operation::RequestPip, describe(&e)))?;
        let inbox = Rc::clone(&self.inbox);
        spawn_local(async move {
            let completion = match JsFuture::from(promise).await {
                Ok(window) => Completion::PipGranted(window),
                Err(e) => Completion::PipFailed(HostError::rejected(
                    Operation::RequestPip,
                    describe(&e),
                )),
            };
            inbox.push(completion);
        });
        Ok(())
    }

    fn exit_pip(&mut self, window: Option<WindowHandle>) -> Result<(), HostError> {
        let _ = self
            .window
            .take_if(|(handle, _)| window.is_none_or(|w| w == *handle));
        if !self.pip_element_active() {
            return Ok(());
        }
        let promise = self
            .page
            .document()
            .unchecked_ref::<PipDocument>()
            .exit_picture_in_picture()
            .map_err(|e| HostError::rejected(Operation::ExitPip, describe(&e)))?;
        // Rejects when the browser already left PiP.
        spawn_local(async move {
            let _ = JsFuture::from(promise).await;
        });
        Ok(())
    }

    fn set_video_playing(&mut self, playing: bool) -> Result<(), HostError> {
        let video = self.video()?;
        if !playing {
            return video
                .pause()
                .map_err(|e| HostError::rejected(Operation::Playback, describe(&e)));
        }
        let promise = video
            .play()
            .map_err(|e| HostError::rejected(Operation::Playback, describe(&e)))?;
        let inbox = Rc::clone(&self.inbox);
        spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                inbox.push(Completion::VideoRejected(HostError::rejected(
                    Operation::Playback,
                    describe(&e),
                )));
            }
        });
        Ok(())
    }

    fn load_artwork(&mut self, request: ArtworkRequest) {
        let ArtworkRequest { generation, url } = request;
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(e) => {
                self.inbox.push(Completion::ArtworkFailed {
                    generation,
                    error: HostError::rejected(Operation::LoadArtwork, describe(&e)),
                });
                return;
            }
        };
        image.set_cross_origin(Some("anonymous"));
        image.set_src(&url);
        let inbox = Rc::clone(&self.inbox);
        spawn_local(async move {
            let completion = match JsFuture::from(image.decode()).await {
                Ok(_) => Completion::ArtworkLoaded { generation, image },
                Err(e) => Completion::ArtworkFailed {
                    generation,
                    error: HostError::rejected(Operation::LoadArtwork, describe(&e)),
                },
            };
            inbox.push(completion);
        });
    }

    fn observe_play_control(&mut self) -> Result<(), HostError> {
        let profile = *self.page.profile();
        let button = self
            .page
            .find(profile.play_toggle)
            .ok_or(HostError::MissingElement("play control"))?;
        let inbox = Rc::clone(&self.inbox);
        let observer = Observer::observe(&button, Watch::ClassOnly, profile, move |batch| {
            inbox.push(Completion::PlayControl(batch));
        })
        .map_err(|e| HostError::rejected(Operation::ObservePlayControl, describe(&e)))?;
        self.play_observer = Some(observer);
        Ok(())
    }

    fn disconnect_play_control(&mut self) {
        self.play_observer = None;
    }

    fn install_media_session(&mut self) -> Result<(), HostError> {
        let navigator = web_sys::window()
            .ok_or(HostError::Unavailable(Capability::MediaSession))?
            .navigator();
        let session = js_sys::Reflect::get(&navigator, &JsValue::from_str("mediaSession"))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
            .ok_or(HostError::Unavailable(Capability::MediaSession))?
            .unchecked_into::<MediaSession>();

        for action in MediaAction::ALL {
            let inbox = Rc::clone(&self.inbox);
            let handler = Closure::wrap(Box::new(move || {
                inbox.push(Completion::Media(action));
            }) as Box<dyn FnMut()>);
            // Browsers throw for actions they do not support; skip those.
            if session
                .set_action_handler(action.as_str(), handler.as_ref())
                .is_ok()
            {
                self.media_handlers.push(handler);
            }
        }
        Ok(())
    }

    fn navigate(&mut self, href: &str) -> Result<(), HostError> {
        web_sys::window()
            .ok_or(HostError::MissingElement("window"))?
            .location()
            .set_href(href)
            .map_err(|e| HostError::rejected(Operation::Navigate, describe(&e)))
    }

    fn cache_stamp(&mut self) -> u64 {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Date.now() is a positive integral millisecond count"
        )]
        let wall = js_sys::Date::now() as u64;
        self.stamp = wall.max(self.stamp + 1);
        self.stamp
    }
}

impl Presenter<HtmlImageElement> for DomPipHost {
    fn text_width(&mut self, text: &str, font: Font) -> f64 {
        match &mut self.elements {
            Some(elements) => elements.presenter.text_width(text, font),
            None => 0.0,
        }
    }

    fn present(&mut self, frame: &Frame<'_, HtmlImageElement>) {
        if let Some(elements) = &mut self.elements {
            elements.presenter.present(frame);
        }
    }
}
