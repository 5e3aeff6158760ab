/// Rendering UI graphics to the OLED.
use core::fmt::Write;

use display_interface::DisplayError;
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_4X6, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle},
    text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder},
};
use heapless::String;

use crate::peripherals::Display;
use stompbox_hmi::{
    control::{Control, Properties},
    mode_navigation::NameList,
    mode_popup::PopupView,
    mode_tools::{MenuPage, SyncState, TunerState},
    OverlayTarget, Screen, ENCODER_PAGES_COUNT,
};

type DisplayResult = Result<(), DisplayError>;

const DISPLAY_WIDTH: i32 = 128;
const DISPLAY_HEIGHT: i32 = 64;
const DISPLAY_CENTER: i32 = DISPLAY_WIDTH / 2;

const HEADER_HEIGHT: u32 = 8;
const ENCODER_COLUMN_WIDTH: i32 = 42;
const ENCODER_Y_POS: i32 = 12;
const ENCODER_VALUE_Y_POS: i32 = 24;
const ENCODER_BAR_Y_POS: i32 = 34;
const ENCODER_BAR_HEIGHT: u32 = 4;

const FOOTER_Y_POS: i32 = 56;
const FOOTER_DIVIDER_Y_POS: i32 = 54;

const OVERLAY_Y_POS: i32 = 18;
const OVERLAY_HEIGHT: u32 = 28;
const OVERLAY_PADDING: i32 = 4;
const OVERLAY_BORDER: u32 = 1;

const MENU_LINE_HEIGHT: i32 = 9;
const MENU_VISIBLE_LINES: u8 = 6;

const POPUP_NAME_Y_POS: i32 = 30;
const POPUP_CHAR_WIDTH: i32 = 6;

const TUNER_NOTE_Y_POS: i32 = 24;
const TUNER_BAR_Y_POS: i32 = 38;

/// [`Screen`] over the SSD1306, plus the overlay countdown the firmware
/// polls from its timer task.
pub struct OledScreen {
    display: Display,
    overlay_remaining_ms: Option<u32>,
    overlay_target: OverlayTarget,
    suppress_redraw: bool,
}

impl OledScreen {
    pub fn new(display: Display) -> OledScreen {
        OledScreen {
            display,
            overlay_remaining_ms: None,
            overlay_target: OverlayTarget::Controls,
            suppress_redraw: false,
        }
    }

    /// Advances the countdown; called every timer tick with the elapsed
    /// milliseconds since the last one.
    pub fn tick(&mut self, elapsed_ms: u32) {
        if let Some(remaining) = self.overlay_remaining_ms {
            self.overlay_remaining_ms = Some(remaining.saturating_sub(elapsed_ms));
        }
    }

    /// Returns the redraw target once the countdown hits zero. The actual
    /// redraw happens in a lower-priority task that can lock the UI state.
    pub fn take_expired(&mut self) -> Option<OverlayTarget> {
        if self.overlay_remaining_ms == Some(0) {
            self.overlay_remaining_ms = None;
            if self.suppress_redraw {
                self.suppress_redraw = false;
                return None;
            }
            return Some(self.overlay_target);
        }
        None
    }

    fn draw_or_log(&mut self, result: DisplayResult) {
        if result.is_err() {
            defmt::error!("[display] draw failed");
        }
    }
}

impl Screen for OledScreen {
    fn clear(&mut self) {
        self.display.clear();
        let result = self.display.flush();
        self.draw_or_log(result);
    }

    fn encoder(&mut self, slot: u8, control: Option<&Control>) {
        let result = draw_encoder(&mut self.display, slot, control).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn footer(&mut self, slot: u8, name: &str, value: &str, properties: Properties) {
        let result =
            draw_footer(&mut self.display, slot, name, value, properties).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn page_index(&mut self, current: u8, available: u8) {
        let result =
            draw_page_index(&mut self.display, current, available).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn encoder_container(&mut self, page: u8) {
        let result = draw_encoder_container(&mut self.display, page).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn control_overlay(&mut self, control: &Control) {
        let result = draw_control_overlay(&mut self.display, control).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn menu_page(&mut self, page: &MenuPage) {
        let result = draw_menu_page(&mut self.display, page).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn name_list(&mut self, list: &NameList) {
        let result = draw_name_list(&mut self.display, list).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn popup(&mut self, view: &PopupView) {
        let result = draw_popup(&mut self.display, view).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn tuner(&mut self, tuner: &TunerState) {
        let result = draw_tuner(&mut self.display, tuner).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn sync(&mut self, sync: &SyncState) {
        let result = draw_sync(&mut self.display, sync).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn attention_overlay(&mut self, message: &str) {
        let result = warning(&mut self.display, message).and_then(|_| self.display.flush());
        self.draw_or_log(result);
    }

    fn set_overlay_timeout(&mut self, ms: u16, target: OverlayTarget) {
        self.overlay_remaining_ms = Some(ms as u32);
        self.overlay_target = target;
        self.suppress_redraw = false;
    }

    fn force_overlay_off(&mut self, run_callback: bool) {
        if self.overlay_remaining_ms.is_some() {
            self.overlay_remaining_ms = Some(0);
            self.suppress_redraw = !run_callback;
        }
    }
}

/// Show snazzy splash screen.
pub fn render_splash_screen(display: &mut Display) -> DisplayResult {
    display.clear();
    Text::with_text_style(
        "STOMPBOX",
        Point::new(DISPLAY_CENTER, 21),
        big_character_style(),
        centered(),
    )
    .draw(display)?;
    Text::with_baseline(
        "warming up the tubes",
        Point::new(24, 42),
        small_character_style(),
        Baseline::Top,
    )
    .draw(display)?;
    display.flush()?;
    Ok(())
}

fn encoder_column_x(slot: u8) -> i32 {
    slot as i32 * (ENCODER_COLUMN_WIDTH + 1)
}

fn draw_encoder(display: &mut Display, slot: u8, control: Option<&Control>) -> DisplayResult {
    let x = encoder_column_x(slot);
    Rectangle::new(
        Point::new(x, ENCODER_Y_POS),
        Size::new(ENCODER_COLUMN_WIDTH as u32, (FOOTER_DIVIDER_Y_POS - ENCODER_Y_POS) as u32),
    )
    .into_styled(background_style())
    .draw(display)?;
    let control = match control {
        Some(control) => control,
        None => return Ok(()),
    };
    Text::with_baseline(
        control.label.as_str(),
        Point::new(x + 1, ENCODER_Y_POS),
        small_character_style(),
        Baseline::Top,
    )
    .draw(display)?;
    let value = control_value_text(control);
    Text::with_baseline(
        value.as_str(),
        Point::new(x + 1, ENCODER_VALUE_Y_POS),
        default_character_style(),
        Baseline::Top,
    )
    .draw(display)?;
    if !control.properties.intersects(Properties::ANY_ENUMERATED) {
        draw_value_bar(display, x, control)?;
    }
    Ok(())
}

fn draw_value_bar(display: &mut Display, x: i32, control: &Control) -> DisplayResult {
    let bar_width = ENCODER_COLUMN_WIDTH as u32 - 4;
    Rectangle::new(
        Point::new(x + 1, ENCODER_BAR_Y_POS),
        Size::new(bar_width, ENCODER_BAR_HEIGHT),
    )
    .into_styled(outline_style())
    .draw(display)?;
    let range = control.maximum - control.minimum;
    let filled = if range > 0.0 {
        ((control.value - control.minimum) / range * bar_width as f32) as u32
    } else {
        0
    };
    Rectangle::new(
        Point::new(x + 1, ENCODER_BAR_Y_POS),
        Size::new(filled.min(bar_width), ENCODER_BAR_HEIGHT),
    )
    .into_styled(filled_style())
    .draw(display)?;
    Ok(())
}

fn draw_footer(
    display: &mut Display,
    slot: u8,
    name: &str,
    value: &str,
    properties: Properties,
) -> DisplayResult {
    let x = encoder_column_x(slot);
    Line::new(
        Point::new(0, FOOTER_DIVIDER_Y_POS),
        Point::new(DISPLAY_WIDTH - 1, FOOTER_DIVIDER_Y_POS),
    )
    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
    .draw(display)?;
    Rectangle::new(
        Point::new(x, FOOTER_Y_POS),
        Size::new(ENCODER_COLUMN_WIDTH as u32, (DISPLAY_HEIGHT - FOOTER_Y_POS) as u32),
    )
    .into_styled(background_style())
    .draw(display)?;
    Text::with_baseline(
        name,
        Point::new(x + 1, FOOTER_Y_POS),
        small_character_style(),
        Baseline::Top,
    )
    .draw(display)?;
    // Momentary switches show a pressed bar instead of a value.
    if properties.intersects(Properties::MOMENTARY) && value.is_empty() {
        return Ok(());
    }
    Text::with_text_style(
        value,
        Point::new(x + ENCODER_COLUMN_WIDTH - 1, FOOTER_Y_POS),
        small_character_style(),
        right_align(),
    )
    .draw(display)?;
    Ok(())
}

fn draw_page_index(display: &mut Display, current: u8, available: u8) -> DisplayResult {
    Rectangle::new(Point::zero(), Size::new(64, HEADER_HEIGHT))
        .into_styled(background_style())
        .draw(display)?;
    let mut text: String<24> = String::new();
    for page in 0..available {
        let symbol = if page == current { 'o' } else { '.' };
        let _ = write!(text, "{}", symbol);
    }
    Text::with_baseline(
        text.as_str(),
        Point::zero(),
        small_character_style(),
        Baseline::Top,
    )
    .draw(display)?;
    Ok(())
}

fn draw_encoder_container(display: &mut Display, page: u8) -> DisplayResult {
    Rectangle::new(Point::new(64, 0), Size::new(64, HEADER_HEIGHT))
        .into_styled(background_style())
        .draw(display)?;
    let mut text: String<8> = String::new();
    let _ = write!(text, "E{}/{}", page + 1, ENCODER_PAGES_COUNT);
    Text::with_text_style(
        text.as_str(),
        Point::new(DISPLAY_WIDTH, 0),
        small_character_style(),
        right_align(),
    )
    .draw(display)?;
    Ok(())
}

fn draw_control_overlay(display: &mut Display, control: &Control) -> DisplayResult {
    overlay_frame(display)?;
    Text::with_text_style(
        control.label.as_str(),
        Point::new(DISPLAY_CENTER, OVERLAY_Y_POS + OVERLAY_PADDING),
        default_character_style(),
        centered_top(),
    )
    .draw(display)?;
    let value = control_value_text(control);
    Text::with_text_style(
        value.as_str(),
        Point::new(DISPLAY_CENTER, OVERLAY_Y_POS + OVERLAY_PADDING + 12),
        default_character_style(),
        centered_top(),
    )
    .draw(display)?;
    Ok(())
}

fn draw_menu_page(display: &mut Display, page: &MenuPage) -> DisplayResult {
    display.clear();
    Text::with_text_style(
        page.title,
        Point::new(DISPLAY_CENTER, 0),
        default_character_style(),
        centered_top(),
    )
    .draw(display)?;
    if page.fixed_slots {
        for (slot, item) in page.items.iter().enumerate() {
            let x = encoder_column_x(slot as u8);
            Text::with_baseline(
                item.label,
                Point::new(x + 1, ENCODER_Y_POS),
                small_character_style(),
                Baseline::Top,
            )
            .draw(display)?;
            if item.has_value {
                let mut value: String<12> = String::new();
                let _ = write!(value, "{}", item.value);
                Text::with_baseline(
                    value.as_str(),
                    Point::new(x + 1, ENCODER_VALUE_Y_POS),
                    default_character_style(),
                    Baseline::Top,
                )
                .draw(display)?;
            }
        }
    } else {
        let first = page.hover.saturating_sub(MENU_VISIBLE_LINES - 1);
        for row in 0..MENU_VISIBLE_LINES {
            let index = first + row;
            let item = match page.items.get(index as usize) {
                Some(item) => item,
                None => break,
            };
            let y = HEADER_HEIGHT as i32 + 2 + row as i32 * MENU_LINE_HEIGHT;
            if index == page.hover {
                Rectangle::new(
                    Point::new(0, y),
                    Size::new(DISPLAY_WIDTH as u32, MENU_LINE_HEIGHT as u32),
                )
                .into_styled(filled_style())
                .draw(display)?;
            }
            let style = if index == page.hover {
                inverted_character_style()
            } else {
                default_character_style()
            };
            Text::with_baseline(item.label, Point::new(2, y), style, Baseline::Top).draw(display)?;
        }
    }
    if page.confirm_active {
        warning(display, "PRESS AGAIN TO CONFIRM")?;
    }
    Ok(())
}

fn draw_name_list(display: &mut Display, list: &NameList) -> DisplayResult {
    Rectangle::new(
        Point::new(0, HEADER_HEIGHT as i32),
        Size::new(DISPLAY_WIDTH as u32, FOOTER_DIVIDER_Y_POS as u32 - HEADER_HEIGHT),
    )
    .into_styled(background_style())
    .draw(display)?;
    let first = list
        .hover
        .saturating_sub(MENU_VISIBLE_LINES as u16 - 1)
        .max(list.window_start);
    for row in 0..MENU_VISIBLE_LINES as u16 {
        let index = first + row;
        let name = match list.names.get((index - list.window_start) as usize) {
            Some(name) => name,
            None => break,
        };
        let y = HEADER_HEIGHT as i32 + 2 + row as i32 * MENU_LINE_HEIGHT;
        if index == list.hover {
            Rectangle::new(
                Point::new(0, y),
                Size::new(DISPLAY_WIDTH as u32, MENU_LINE_HEIGHT as u32),
            )
            .into_styled(filled_style())
            .draw(display)?;
        }
        let style = if index == list.hover {
            inverted_character_style()
        } else {
            default_character_style()
        };
        let marker = if list.selected == Some(index) { "*" } else { " " };
        Text::with_baseline(marker, Point::new(0, y), style, Baseline::Top).draw(display)?;
        Text::with_baseline(name.as_str(), Point::new(8, y), style, Baseline::Top).draw(display)?;
    }
    Ok(())
}

fn draw_popup(display: &mut Display, view: &PopupView) -> DisplayResult {
    display.clear();
    Rectangle::new(
        Point::new(2, 2),
        Size::new(DISPLAY_WIDTH as u32 - 4, DISPLAY_HEIGHT as u32 - 4),
    )
    .into_styled(outline_style())
    .draw(display)?;
    Text::with_text_style(
        view.title,
        Point::new(DISPLAY_CENTER, 6),
        default_character_style(),
        centered_top(),
    )
    .draw(display)?;
    if view.has_name {
        let name_x = DISPLAY_CENTER - (view.name.len() as i32 * POPUP_CHAR_WIDTH) / 2;
        Text::with_baseline(
            view.name.as_str(),
            Point::new(name_x, POPUP_NAME_Y_POS),
            default_character_style(),
            Baseline::Top,
        )
        .draw(display)?;
        let cursor_x = name_x + view.cursor as i32 * POPUP_CHAR_WIDTH;
        let cursor_y = POPUP_NAME_Y_POS + 11;
        Line::new(
            Point::new(cursor_x, cursor_y),
            Point::new(cursor_x + POPUP_CHAR_WIDTH - 2, cursor_y),
        )
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(display)?;
        let hint = if view.keyboard_active {
            "turn: pick  click: done"
        } else {
            "turn: move  click: edit"
        };
        Text::with_text_style(
            hint,
            Point::new(DISPLAY_CENTER, 46),
            small_character_style(),
            centered_top(),
        )
        .draw(display)?;
    } else {
        Text::with_text_style(
            "YES         NO",
            Point::new(DISPLAY_CENTER, 46),
            default_character_style(),
            centered_top(),
        )
        .draw(display)?;
    }
    Ok(())
}

fn draw_tuner(display: &mut Display, tuner: &TunerState) -> DisplayResult {
    display.clear();
    Text::with_text_style(
        "TUNER",
        Point::new(DISPLAY_CENTER, 0),
        default_character_style(),
        centered_top(),
    )
    .draw(display)?;
    Text::with_text_style(
        tuner.note.as_str(),
        Point::new(DISPLAY_CENTER, TUNER_NOTE_Y_POS),
        big_character_style(),
        centered(),
    )
    .draw(display)?;
    // Cents needle: -50..50 mapped across the display width.
    let needle_x = DISPLAY_CENTER + tuner.cents.clamp(-50, 50) * (DISPLAY_CENTER - 4) / 50;
    Line::new(
        Point::new(needle_x, TUNER_BAR_Y_POS),
        Point::new(needle_x, TUNER_BAR_Y_POS + 6),
    )
    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 3))
    .draw(display)?;
    Line::new(
        Point::new(DISPLAY_CENTER, TUNER_BAR_Y_POS + 2),
        Point::new(DISPLAY_CENTER, TUNER_BAR_Y_POS + 4),
    )
    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
    .draw(display)?;
    let mut status: String<32> = String::new();
    let _ = write!(
        status,
        "{:.1}Hz  IN{}  A={}",
        tuner.freq,
        tuner.input + 1,
        tuner.ref_freq
    );
    Text::with_baseline(
        status.as_str(),
        Point::new(0, FOOTER_Y_POS),
        small_character_style(),
        Baseline::Top,
    )
    .draw(display)?;
    if tuner.mute {
        Text::with_text_style(
            "MUTE",
            Point::new(DISPLAY_WIDTH, FOOTER_Y_POS),
            small_character_style(),
            right_align(),
        )
        .draw(display)?;
    }
    Ok(())
}

fn draw_sync(display: &mut Display, sync: &SyncState) -> DisplayResult {
    display.clear();
    Text::with_text_style(
        "TEMPO",
        Point::new(DISPLAY_CENTER, 0),
        default_character_style(),
        centered_top(),
    )
    .draw(display)?;
    let mut bpm: String<12> = String::new();
    let _ = write!(bpm, "{:.1}", sync.bpm);
    Text::with_text_style(
        bpm.as_str(),
        Point::new(DISPLAY_CENTER, 28),
        big_character_style(),
        centered(),
    )
    .draw(display)?;
    let mut footer: String<24> = String::new();
    let _ = write!(footer, "{}/4", sync.beats_per_bar);
    Text::with_baseline(
        footer.as_str(),
        Point::new(0, FOOTER_Y_POS),
        small_character_style(),
        Baseline::Top,
    )
    .draw(display)?;
    if sync.playing {
        Text::with_text_style(
            ">",
            Point::new(DISPLAY_WIDTH, FOOTER_Y_POS),
            small_character_style(),
            right_align(),
        )
        .draw(display)?;
    }
    Ok(())
}

fn control_value_text(control: &Control) -> String<20> {
    let mut text: String<20> = String::new();
    if control.properties.intersects(Properties::ANY_ENUMERATED) {
        if let Some(point) = control.current_scale_point() {
            let _ = write!(text, "{}", point.label);
            return text;
        }
    }
    let _ = write!(text, "{:.2}{}", control.value, control.unit);
    text
}

fn overlay_frame(display: &mut Display) -> DisplayResult {
    let style = PrimitiveStyleBuilder::new()
        .stroke_color(BinaryColor::On)
        .stroke_width(OVERLAY_BORDER)
        .fill_color(BinaryColor::Off)
        .build();
    Rectangle::new(
        Point::new(6, OVERLAY_Y_POS),
        Size::new(DISPLAY_WIDTH as u32 - 12, OVERLAY_HEIGHT),
    )
    .into_styled(style)
    .draw(display)?;
    Ok(())
}

fn warning(display: &mut Display, text: &str) -> DisplayResult {
    overlay_frame(display)?;
    Text::with_text_style(
        text,
        Point::new(DISPLAY_CENTER, OVERLAY_Y_POS + OVERLAY_HEIGHT as i32 / 2),
        default_character_style(),
        centered(),
    )
    .draw(display)?;
    Ok(())
}

fn default_character_style<'a>() -> MonoTextStyle<'a, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

fn inverted_character_style<'a>() -> MonoTextStyle<'a, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::Off)
}

fn small_character_style<'a>() -> MonoTextStyle<'a, BinaryColor> {
    MonoTextStyle::new(&FONT_4X6, BinaryColor::On)
}

fn big_character_style<'a>() -> MonoTextStyle<'a, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

fn background_style() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(BinaryColor::Off)
}

fn filled_style() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_fill(BinaryColor::On)
}

fn outline_style() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_stroke(BinaryColor::On, 1)
}

fn centered() -> TextStyle {
    TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build()
}

fn centered_top() -> TextStyle {
    TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build()
}

fn right_align() -> TextStyle {
    TextStyleBuilder::new()
        .alignment(Alignment::Right)
        .baseline(Baseline::Top)
        .build()
}
