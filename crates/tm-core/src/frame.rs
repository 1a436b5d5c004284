/// Number of bytes per pixel in every color buffer of the pipeline (RGB24).
pub const CHANNELS: usize = 3;

/// Buffer de pixels RGB24, row-major, 3 bytes par pixel, sans padding.
///
/// # Example
/// ```
/// use tm_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 300);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixels RGB, row-major, 3 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer noir aux dimensions données.
    ///
    /// # Example
    /// ```
    /// use tm_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(100, 50);
    /// assert_eq!(fb.width, 100);
    /// assert_eq!(fb.height, 50);
    /// assert!(fb.data.iter().all(|&b| b == 0));
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; Self::byte_len(width, height)],
            width,
            height,
        }
    }

    /// Buffer uniformément rempli avec la couleur `rgb`.
    ///
    /// # Example
    /// ```
    /// use tm_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::filled(2, 2, (200, 200, 200));
    /// assert_eq!(fb.pixel(1, 1), (200, 200, 200));
    /// ```
    #[must_use]
    pub fn filled(width: u32, height: u32, rgb: (u8, u8, u8)) -> Self {
        let data = [rgb.0, rgb.1, rgb.2].repeat(width as usize * height as usize);
        Self {
            data,
            width,
            height,
        }
    }

    /// Expected buffer length for the given dimensions.
    #[must_use]
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    /// Length of one row in bytes.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// True if `data` holds exactly `width × height` RGB pixels.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.data.len() == Self::byte_len(self.width, self.height)
    }

    /// Accès au pixel (x, y) → (r, g, b).
    #[inline]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = y as usize * self.stride() + x as usize * CHANNELS;
        match self.data.get(idx..idx + CHANNELS) {
            Some(px) => (px[0], px[1], px[2]),
            None => (0, 0, 0),
        }
    }

    /// Luma Rec.601 du pixel (x, y).
    #[inline]
    #[must_use]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        let (r, g, b) = self.pixel(x, y);
        luma(r, g, b)
    }
}

/// Luma Rec.601 (0.299 R + 0.587 G + 0.114 B), arrondie à l'entier le plus proche.
///
/// # Example
/// ```
/// use tm_core::frame::luma;
/// assert_eq!(luma(255, 255, 255), 255);
/// assert_eq!(luma(0, 0, 0), 0);
/// assert_eq!(luma(200, 200, 200), 200);
/// ```
#[inline]
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8
}

/// A decoded frame together with its position in the input stream.
#[derive(Clone, Debug)]
pub struct SourceFrame {
    /// Input sequence number, starting at 0.
    pub index: u64,
    /// Presentation time in seconds.
    pub pts_secs: f64,
    /// Pixel data.
    pub frame: FrameBuffer,
}

/// Grille de luminance, une valeur par bloc.
///
/// # Example
/// ```
/// use tm_core::frame::LumaGrid;
/// let mut grid = LumaGrid::new(4, 3);
/// grid.set(3, 2, 255);
/// assert_eq!(grid.get(3, 2), 255);
/// assert_eq!(grid.cells.len(), 12);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LumaGrid {
    /// Flat array of cells, row-major.
    pub cells: Vec<u8>,
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
}

impl LumaGrid {
    /// Crée une grille noire.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            cells: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Build a grid from row-major cells.
    ///
    /// Returns `None` if `cells.len() != width × height`.
    #[must_use]
    pub fn from_cells(width: u32, height: u32, cells: Vec<u8>) -> Option<Self> {
        (cells.len() == width as usize * height as usize).then_some(Self {
            cells,
            width,
            height,
        })
    }

    /// Grid dimensions for a frame of `frame_w × frame_h` and square blocks of `block_size`.
    ///
    /// Remainder rows and columns are dropped. `block_size` must be non-zero.
    ///
    /// # Example
    /// ```
    /// use tm_core::frame::LumaGrid;
    /// assert_eq!(LumaGrid::dims_for(105, 105, 10), (10, 10));
    /// assert_eq!(LumaGrid::dims_for(5, 40, 10), (0, 4));
    /// ```
    #[must_use]
    pub fn dims_for(frame_w: u32, frame_h: u32, block_size: u32) -> (u32, u32) {
        debug_assert!(block_size > 0, "block_size must be validated upstream");
        let block = block_size.max(1);
        (frame_w / block, frame_h / block)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.cells[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.cells[y as usize * self.width as usize + x as usize] = value;
    }

    /// True when every cell is either 0 or 255.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.cells.iter().all(|&v| v == 0 || v == 255)
    }

    /// True when the grid has no cells (frame smaller than one block).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
