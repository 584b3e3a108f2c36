// SPDX-License-Identifier: MPL-2.0
use pdf_album::app::{self, Flags};

fn main() -> iced::Result {
    let mut args = pico_args::Arguments::from_env();

    let flags = Flags {
        english: args.contains("--english"),
    };

    app::run(flags)
}
