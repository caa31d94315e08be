// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! 4-connected component labelling over a binary mask

/// One connected foreground region
#[derive(Debug, Clone)]
pub struct Component {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
    /// Member pixels as (x, y)
    pub pixels: Vec<(usize, usize)>,
}

impl Component {
    pub fn area(&self) -> usize {
        self.pixels.len()
    }

    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// Binary mask in row-major order
#[derive(Debug, Clone)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    bits: Vec<bool>,
}

impl Mask {
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                bits.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.bits[y * self.width + x]
    }

    /// Whether a set pixel touches the background or the mask edge
    pub fn is_boundary(&self, x: usize, y: usize) -> bool {
        if !self.get(x, y) {
            return false;
        }
        x == 0
            || y == 0
            || x + 1 == self.width
            || y + 1 == self.height
            || !self.get(x - 1, y)
            || !self.get(x + 1, y)
            || !self.get(x, y - 1)
            || !self.get(x, y + 1)
    }

    /// Label every 4-connected region, scanning rows top to bottom
    pub fn components(&self) -> Vec<Component> {
        let mut visited = vec![false; self.bits.len()];
        let mut found = Vec::new();

        for start_y in 0..self.height {
            for start_x in 0..self.width {
                let index = start_y * self.width + start_x;
                if !self.bits[index] || visited[index] {
                    continue;
                }

                visited[index] = true;
                let mut component = Component {
                    min_x: start_x,
                    max_x: start_x,
                    min_y: start_y,
                    max_y: start_y,
                    pixels: Vec::new(),
                };
                let mut stack = vec![(start_x, start_y)];

                while let Some((x, y)) = stack.pop() {
                    component.pixels.push((x, y));
                    component.min_x = component.min_x.min(x);
                    component.max_x = component.max_x.max(x);
                    component.min_y = component.min_y.min(y);
                    component.max_y = component.max_y.max(y);

                    let mut visit = |nx: usize, ny: usize| {
                        let n = ny * self.width + nx;
                        if self.bits[n] && !visited[n] {
                            visited[n] = true;
                            stack.push((nx, ny));
                        }
                    };
                    if x > 0 {
                        visit(x - 1, y);
                    }
                    if x + 1 < self.width {
                        visit(x + 1, y);
                    }
                    if y > 0 {
                        visit(x, y - 1);
                    }
                    if y + 1 < self.height {
                        visit(x, y + 1);
                    }
                }

                found.push(component);
            }
        }

        found
    }
}
