pub(crate) mod keymap;
